//! Handlers for the `/algorithms` resource.
//!
//! The details view picks a version, a metrics record and a molecule from
//! optional query parameters, falling back to sensible defaults, and returns
//! everything the page needs to render, including the per-version chart.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use qbench_core::error::CoreError;
use qbench_core::selection::{
    self, ChartRow, DetailParams, JoinedMetrics, MetricsKey, VersionKey,
};
use qbench_core::types::DbId;
use qbench_db::models::algorithm::Algorithm;
use qbench_db::models::algorithm_version::AlgorithmVersion;
use qbench_db::models::metrics::{Metrics, VersionMetricsRow};
use qbench_db::models::molecule::{Molecule, MoleculeSummary};
use qbench_db::repositories::{AlgorithmRepo, AlgorithmVersionRepo, MetricsRepo, MoleculeRepo};
use qbench_db::DbPool;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::DetailQuery;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A version together with its 1-based position in the algorithm's history.
#[derive(Debug, Clone, Serialize)]
pub struct VersionView {
    #[serde(flatten)]
    pub version: AlgorithmVersion,
    pub version_number: i64,
}

/// Payload of the algorithm details page.
#[derive(Debug, Serialize)]
pub struct AlgorithmDetails {
    pub algorithm: Algorithm,
    /// Most recent first.
    pub versions: Vec<VersionView>,
    /// The effective selection.
    pub params: DetailParams,
    pub metrics_graph_data: Vec<ChartRow>,
    /// Metrics of the selected version.
    pub metrics: Vec<Metrics>,
    pub molecules_with_metrics: Vec<MoleculeSummary>,
    pub selected_version: Option<VersionView>,
    pub selected_metrics: Option<Metrics>,
    pub selected_molecule: Option<Molecule>,
    pub molecules: Vec<Molecule>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/algorithms/{algorithm_id}
///
/// Unknown algorithms redirect to the landing page. Private algorithms are
/// only served to their owner.
pub async fn get_details(
    State(state): State<AppState>,
    Path(algorithm_id): Path<DbId>,
    Query(pairs): Query<Vec<(String, String)>>,
    user: Option<AuthUser>,
) -> AppResult<Response> {
    let Some(algorithm) = AlgorithmRepo::find_by_id(&state.pool, algorithm_id).await? else {
        tracing::debug!(algorithm_id, "Unknown algorithm, redirecting to landing page");
        return Ok(Redirect::to(&state.config.home_path).into_response());
    };

    let requester = user.as_ref().map(|u| u.user_id);
    if !algorithm.is_visible_to(requester) {
        tracing::info!(algorithm_id, ?requester, "Denied access to private algorithm");
        return Err(AppError::Core(CoreError::Forbidden(
            "This algorithm is private".into(),
        )));
    }

    let params = DetailQuery::from_pairs(pairs).params();
    let details = load_details(&state.pool, algorithm, params).await?;
    Ok(Json(DataResponse { data: details }).into_response())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn load_details(
    pool: &DbPool,
    algorithm: Algorithm,
    requested: DetailParams,
) -> AppResult<AlgorithmDetails> {
    let versions = AlgorithmVersionRepo::list_by_algorithm(pool, algorithm.id).await?;
    let metrics = MetricsRepo::list_by_algorithm(pool, algorithm.id).await?;
    let molecules = MoleculeRepo::list_all(pool).await?;

    let version_keys: Vec<VersionKey> = versions.iter().map(AlgorithmVersion::key).collect();
    let metrics_keys: Vec<MetricsKey> = metrics.iter().map(Metrics::key).collect();
    let selection = selection::resolve(requested, &version_keys, &metrics_keys);
    let ordinals = selection::version_ordinals(&version_keys);

    let versions: Vec<VersionView> = versions
        .into_iter()
        .map(|version| VersionView {
            version_number: ordinals.get(&version.id).copied().unwrap_or_default(),
            version,
        })
        .collect();
    let selected_version = versions
        .iter()
        .find(|v| Some(v.version.id) == selection.version_id)
        .cloned();

    let metrics: Vec<Metrics> = metrics
        .into_iter()
        .filter(|m| selection.metrics_ids.contains(&m.id))
        .collect();
    let selected_metrics = metrics
        .iter()
        .find(|m| Some(m.id) == selection.metrics_id)
        .cloned();

    let molecules_with_metrics: Vec<MoleculeSummary> = molecules
        .iter()
        .filter(|m| selection.molecule_ids.contains(&m.id))
        .map(|m| MoleculeSummary {
            id: m.id,
            name: m.name.clone(),
        })
        .collect();
    let selected_molecule = molecules
        .iter()
        .find(|m| Some(m.id) == selection.molecule_id)
        .cloned();

    let metrics_graph_data = match selection.molecule_id {
        Some(molecule_id) => chart_for_molecule(pool, algorithm.id, molecule_id).await?,
        None => Vec::new(),
    };

    Ok(AlgorithmDetails {
        algorithm,
        versions,
        params: selection.params,
        metrics_graph_data,
        metrics,
        molecules_with_metrics,
        selected_version,
        selected_metrics,
        selected_molecule,
        molecules,
    })
}

async fn chart_for_molecule(
    pool: &DbPool,
    algorithm_id: DbId,
    molecule_id: DbId,
) -> AppResult<Vec<ChartRow>> {
    let joined: Vec<JoinedMetrics> =
        MetricsRepo::version_metrics_for_molecule(pool, algorithm_id, molecule_id)
            .await?
            .into_iter()
            .map(VersionMetricsRow::into_joined)
            .collect();
    Ok(selection::chart_rows(&joined))
}
