//! Shared query parameter types for API handlers.

use qbench_core::selection::DetailParams;

/// Raw `?version_id=&metrics_id=&molecule_id=` parameters.
///
/// Kept as strings so malformed values degrade to "absent" instead of
/// rejecting the request. Extract the query as `Query<Vec<(String, String)>>`
/// and build this with [`DetailQuery::from_pairs`] so repeated keys are
/// accepted too.
#[derive(Debug, Default)]
pub struct DetailQuery {
    pub version_id: Option<String>,
    pub metrics_id: Option<String>,
    pub molecule_id: Option<String>,
}

impl DetailQuery {
    /// Collect the known keys; the last occurrence of a repeated key wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "version_id" => query.version_id = Some(value),
                "metrics_id" => query.metrics_id = Some(value),
                "molecule_id" => query.molecule_id = Some(value),
                _ => {}
            }
        }
        query
    }

    pub fn params(&self) -> DetailParams {
        DetailParams::parse(
            self.version_id.as_deref(),
            self.metrics_id.as_deref(),
            self.molecule_id.as_deref(),
        )
    }
}
