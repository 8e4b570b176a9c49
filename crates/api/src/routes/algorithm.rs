//! Route definitions for algorithms.

use axum::routing::get;
use axum::Router;

use crate::handlers::algorithm;
use crate::state::AppState;

/// Routes mounted at `/algorithms`.
///
/// ```text
/// GET    /{algorithm_id}                           -> get_details
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{algorithm_id}", get(algorithm::get_details))
}
