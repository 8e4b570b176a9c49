pub mod algorithm;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /algorithms/{algorithm_id}                       details view (GET)
///     ?version_id=&metrics_id=&molecule_id=
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/algorithms", algorithm::router())
}
