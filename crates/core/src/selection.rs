//! Selection logic for the algorithm details view.
//!
//! The view receives three loosely-typed ids from the query string and has to
//! turn them into a consistent choice of version, metrics record and molecule.
//! Everything here works on lightweight keys so it can be exercised without a
//! database; the handler loads the full rows afterwards.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parse a query parameter into a positive id.
///
/// Missing, empty, zero, negative and non-numeric values all yield `None`.
pub fn to_positive_id(value: Option<&str>) -> Option<DbId> {
    value?
        .trim()
        .parse::<DbId>()
        .ok()
        .filter(|id| *id > 0)
}

/// The three optional selections of the details view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetailParams {
    pub version_id: Option<DbId>,
    pub metrics_id: Option<DbId>,
    pub molecule_id: Option<DbId>,
}

impl DetailParams {
    pub fn parse(
        version_id: Option<&str>,
        metrics_id: Option<&str>,
        molecule_id: Option<&str>,
    ) -> Self {
        Self {
            version_id: to_positive_id(version_id),
            metrics_id: to_positive_id(metrics_id),
            molecule_id: to_positive_id(molecule_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionKey {
    pub id: DbId,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsKey {
    pub id: DbId,
    pub version_id: DbId,
    pub molecule_id: DbId,
}

/// 1-based rank of each version by ascending timestamp. Ties break on id.
pub fn version_ordinals(versions: &[VersionKey]) -> HashMap<DbId, i64> {
    let mut ordered: Vec<&VersionKey> = versions.iter().collect();
    ordered.sort_by_key(|v| (v.timestamp, v.id));
    ordered
        .into_iter()
        .zip(1..)
        .map(|(v, ordinal)| (v.id, ordinal))
        .collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The effective selection for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Requested params with the resolved ids written back.
    pub params: DetailParams,
    pub version_id: Option<DbId>,
    /// Metrics of the selected version, ascending id.
    pub metrics_ids: Vec<DbId>,
    pub metrics_id: Option<DbId>,
    /// Distinct molecules with metrics in any version, ascending id.
    pub molecule_ids: Vec<DbId>,
    pub molecule_id: Option<DbId>,
}

/// Resolve the requested params against an algorithm's versions and metrics.
///
/// `metrics` may contain records of other algorithms; only those attached to
/// one of `versions` are considered.
pub fn resolve(
    requested: DetailParams,
    versions: &[VersionKey],
    metrics: &[MetricsKey],
) -> Selection {
    let version_id = requested
        .version_id
        .filter(|id| versions.iter().any(|v| v.id == *id))
        .or_else(|| latest_version(versions));

    let mut metrics_ids: Vec<DbId> = metrics
        .iter()
        .filter(|m| Some(m.version_id) == version_id)
        .map(|m| m.id)
        .collect();
    metrics_ids.sort_unstable();
    metrics_ids.dedup();
    let metrics_id = id_or_first(requested.metrics_id, &metrics_ids);

    let mut molecule_ids: Vec<DbId> = metrics
        .iter()
        .filter(|m| versions.iter().any(|v| v.id == m.version_id))
        .map(|m| m.molecule_id)
        .collect();
    molecule_ids.sort_unstable();
    molecule_ids.dedup();
    let molecule_id = id_or_first(requested.molecule_id, &molecule_ids);

    Selection {
        params: DetailParams {
            version_id,
            metrics_id,
            molecule_id,
        },
        version_id,
        metrics_ids,
        metrics_id,
        molecule_ids,
        molecule_id,
    }
}

fn latest_version(versions: &[VersionKey]) -> Option<DbId> {
    versions
        .iter()
        .max_by_key(|v| (v.timestamp, v.id))
        .map(|v| v.id)
}

fn id_or_first(requested: Option<DbId>, candidates: &[DbId]) -> Option<DbId> {
    requested
        .filter(|id| candidates.contains(id))
        .or_else(|| candidates.first().copied())
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// Measurement columns plotted on the details chart.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartMeasurements {
    pub iterations: Option<f64>,
    pub measurements: Option<i64>,
    pub circuit_depth: Option<i32>,
    pub accuracy: Option<f64>,
}

/// One row of the version/metrics left join for a single molecule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedMetrics {
    pub version: VersionKey,
    /// `None` when the version has no metrics for the molecule.
    pub metrics_id: Option<DbId>,
    pub values: ChartMeasurements,
}

/// `[ordinal, iterations, measurements, circuit_depth, accuracy]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartRow(
    pub i64,
    pub Option<f64>,
    pub Option<i64>,
    pub Option<i32>,
    pub Option<f64>,
);

/// Collapse joined rows into one chart row per version, oldest first.
///
/// A version with several metrics for the molecule is represented by its
/// newest record (highest id).
pub fn chart_rows(joined: &[JoinedMetrics]) -> Vec<ChartRow> {
    let mut ordered: Vec<&JoinedMetrics> = joined.iter().collect();
    ordered.sort_by(|a, b| {
        (a.version.timestamp, a.version.id)
            .cmp(&(b.version.timestamp, b.version.id))
            .then(b.metrics_id.cmp(&a.metrics_id))
    });
    ordered.dedup_by_key(|row| row.version.id);

    ordered
        .into_iter()
        .zip(1..)
        .map(|(row, ordinal)| {
            let v = row.values;
            ChartRow(
                ordinal,
                v.iterations,
                v.measurements,
                v.circuit_depth,
                v.accuracy,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
