//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod algorithm_repo;
pub mod algorithm_version_repo;
pub mod metrics_repo;
pub mod molecule_repo;
pub mod user_repo;

pub use algorithm_repo::AlgorithmRepo;
pub use algorithm_version_repo::AlgorithmVersionRepo;
pub use metrics_repo::MetricsRepo;
pub use molecule_repo::MoleculeRepo;
pub use user_repo::UserRepo;
