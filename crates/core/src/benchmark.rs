//! Benchmark request, result and callback envelope types.
//!
//! A [`BenchmarkRequest`] arrives from the task queue exactly as the producer
//! wrote it. [`BenchmarkRequest::into_job`] sanitizes it into the
//! [`BenchmarkJob`] that is handed to the benchmark library, and the outcome
//! of that run is reported back as a [`ResultEnvelope`].

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Error message reported to the callback endpoint for any failed analysis.
pub const ANALYSIS_ERROR_MESSAGE: &str = "error occurred in analysis";

/// Failure reason used when the benchmark library gives no detail.
pub const GENERIC_FAILURE_REASON: &str = "computation failed";

/// Simulation backend every benchmark runs on.
pub const SIMULATION_BACKEND: &str = "qulacs";

/// Number of VQE repetitions per benchmark.
pub const BENCHMARK_REPETITIONS: u32 = 100;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Molecule description as sent by the producer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MoleculeSpec {
    pub structure: String,
    pub basis_set: String,
    #[serde(default)]
    pub active_orbitals: String,
    /// May be missing, `null` or an empty string; all three mean "none".
    #[serde(default)]
    pub transformation: Option<String>,
}

/// A benchmark request taken off the task queue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BenchmarkRequest {
    pub metrics_id: DbId,
    pub molecule: MoleculeSpec,
    pub circuit: String,
    pub optimizer_module: String,
    pub optimizer_method: String,
}

impl BenchmarkRequest {
    /// Split the request into its metrics id and the sanitized job.
    pub fn into_job(self) -> (DbId, BenchmarkJob) {
        let job = BenchmarkJob {
            molecule: self.molecule.normalize(),
            circuit: self.circuit,
            optimizer: OptimizerSpec {
                module: self.optimizer_module,
                method: self.optimizer_method,
            },
            backend: SIMULATION_BACKEND.to_string(),
            repetitions: BENCHMARK_REPETITIONS,
        };
        (self.metrics_id, job)
    }
}

impl MoleculeSpec {
    /// Produce the molecule in the shape the benchmark library accepts.
    ///
    /// An empty transformation becomes the explicit `None` marker and carriage
    /// returns are removed from the structure and active-orbital text; the
    /// library's geometry parser rejects them.
    pub fn normalize(self) -> Molecule {
        Molecule {
            structure: strip_carriage_returns(&self.structure),
            basis_set: self.basis_set,
            active_orbitals: strip_carriage_returns(&self.active_orbitals),
            transformation: self.transformation.filter(|t| !t.is_empty()),
        }
    }
}

fn strip_carriage_returns(text: &str) -> String {
    text.replace('\r', "")
}

// ---------------------------------------------------------------------------
// Job (downstream payload)
// ---------------------------------------------------------------------------

/// Molecule as passed to the benchmark library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub structure: String,
    pub basis_set: String,
    pub active_orbitals: String,
    /// `None` serializes as an explicit `null`, never as an absent key.
    pub transformation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSpec {
    pub module: String,
    pub method: String,
}

/// Everything the benchmark library needs for one VQE benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkJob {
    pub molecule: Molecule,
    pub circuit: String,
    pub optimizer: OptimizerSpec,
    pub backend: String,
    pub repetitions: u32,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Output of a successful VQE benchmark.
///
/// JSON has no NaN or infinity: non-finite floats are written as `null`
/// and `null` reads back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    #[serde(deserialize_with = "nullable_float::vec")]
    pub average_history: Vec<f64>,
    #[serde(deserialize_with = "nullable_float::vec")]
    pub accuracy_history: Vec<f64>,
    pub qubit_count: u32,
    pub gate_depth: u32,
    #[serde(deserialize_with = "nullable_float::one")]
    pub average_iterations: f64,
    #[serde(deserialize_with = "nullable_float::one")]
    pub success_rate: f64,
}

mod nullable_float {
    use serde::{Deserialize, Deserializer};

    pub fn one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    pub fn vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// Why a benchmark produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeFailure {
    pub reason: String,
}

impl ComputeFailure {
    /// Blank reasons fall back to [`GENERIC_FAILURE_REASON`].
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Self::unspecified();
        }
        Self { reason }
    }

    pub fn unspecified() -> Self {
        Self {
            reason: GENERIC_FAILURE_REASON.to_string(),
        }
    }
}

impl std::fmt::Display for ComputeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of the call into the benchmark library.
pub type ComputeOutcome = Result<BenchmarkResult, ComputeFailure>;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The message posted to the result callback. Exactly one per request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success {
        metrics_id: DbId,
        result: BenchmarkResult,
    },
    Failure {
        metrics_id: DbId,
        error: String,
    },
}

#[derive(Serialize)]
struct SuccessPayload<'a> {
    metrics_id: DbId,
    #[serde(flatten)]
    result: &'a BenchmarkResult,
}

#[derive(Serialize)]
struct FailurePayload<'a> {
    error: &'a str,
    metrics_id: DbId,
}

impl ResultEnvelope {
    /// Build the envelope for a finished computation.
    ///
    /// The failure reason is deliberately not forwarded; the callback only
    /// ever sees [`ANALYSIS_ERROR_MESSAGE`].
    pub fn from_outcome(metrics_id: DbId, outcome: ComputeOutcome) -> Self {
        match outcome {
            Ok(result) => Self::Success { metrics_id, result },
            Err(_) => Self::Failure {
                metrics_id,
                error: ANALYSIS_ERROR_MESSAGE.to_string(),
            },
        }
    }

    pub fn metrics_id(&self) -> DbId {
        match self {
            Self::Success { metrics_id, .. } | Self::Failure { metrics_id, .. } => *metrics_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// JSON form of the envelope.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Success { metrics_id, result } => serde_json::to_value(SuccessPayload {
                metrics_id: *metrics_id,
                result,
            }),
            Self::Failure { metrics_id, error } => serde_json::to_value(FailurePayload {
                error,
                metrics_id: *metrics_id,
            }),
        }
    }

    /// Form fields for the callback POST.
    ///
    /// Success sends the JSON document in a single `data` field. Failure sends
    /// `error` and `metrics_id` as plain fields, which is what the receiving
    /// endpoint checks for.
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        match self {
            Self::Success { metrics_id, result } => {
                let data = serde_json::to_string(&SuccessPayload {
                    metrics_id: *metrics_id,
                    result,
                })?;
                Ok(vec![("data", data)])
            }
            Self::Failure { metrics_id, error } => Ok(vec![
                ("error", error.clone()),
                ("metrics_id", metrics_id.to_string()),
            ]),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
