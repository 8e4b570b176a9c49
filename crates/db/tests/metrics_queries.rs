//! Integration tests for the repositories backing the algorithm details view.
//!
//! Exercises the version listing order, the per-algorithm metrics listing and
//! the version/metrics left join used for the chart.

use chrono::{Duration, TimeZone, Utc};
use qbench_db::models::algorithm::CreateAlgorithm;
use qbench_db::models::algorithm_version::CreateAlgorithmVersion;
use qbench_db::models::metrics::CreateMetrics;
use qbench_db::models::molecule::CreateMolecule;
use qbench_db::models::user::CreateUser;
use qbench_db::repositories::{
    AlgorithmRepo, AlgorithmVersionRepo, MetricsRepo, MoleculeRepo, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_algorithm(pool: &PgPool, name: &str, public: bool) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: format!("{name}-owner"),
        },
    )
    .await
    .unwrap();
    AlgorithmRepo::create(
        pool,
        &CreateAlgorithm {
            user_id: user.id,
            name: name.to_string(),
            public: Some(public),
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_version(pool: &PgPool, algorithm_id: i64, hours_after_epoch: i64) -> i64 {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    AlgorithmVersionRepo::create(
        pool,
        &CreateAlgorithmVersion {
            algorithm_id,
            description: None,
            circuit: "circuit".to_string(),
            optimizer_module: "scipy".to_string(),
            optimizer_method: "BFGS".to_string(),
            timestamp: Some(base + Duration::hours(hours_after_epoch)),
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_molecule(pool: &PgPool, name: &str) -> i64 {
    MoleculeRepo::create(
        pool,
        &CreateMolecule {
            name: name.to_string(),
            structure: "H 0 0 0\nH 0 0 0.74".to_string(),
            basis_set: "sto-3g".to_string(),
            active_orbitals: None,
            transformation: Some(String::new()),
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_metrics(pool: &PgPool, version_id: i64, molecule_id: i64, iterations: f64) -> i64 {
    MetricsRepo::create(
        pool,
        &CreateMetrics {
            algorithm_version_id: version_id,
            molecule_id,
            iterations: Some(iterations),
            measurements: Some(2048),
            circuit_depth: Some(9),
            accuracy: Some(0.002),
            ..CreateMetrics::default()
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn versions_are_listed_most_recent_first(pool: PgPool) {
    let algorithm_id = new_algorithm(&pool, "vqe-order", true).await;
    let older = new_version(&pool, algorithm_id, 1).await;
    let newer = new_version(&pool, algorithm_id, 5).await;

    let versions = AlgorithmVersionRepo::list_by_algorithm(&pool, algorithm_id)
        .await
        .unwrap();
    let ids: Vec<i64> = versions.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_transformation_is_stored_as_null(pool: PgPool) {
    let id = new_molecule(&pool, "H2").await;
    let molecule = MoleculeRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(molecule.transformation, None);
    assert_eq!(molecule.active_orbitals, "");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn metrics_listing_is_scoped_to_the_algorithm(pool: PgPool) {
    let algorithm_id = new_algorithm(&pool, "vqe-a", true).await;
    let other_algorithm_id = new_algorithm(&pool, "vqe-b", true).await;
    let version = new_version(&pool, algorithm_id, 1).await;
    let other_version = new_version(&pool, other_algorithm_id, 1).await;
    let h2 = new_molecule(&pool, "H2").await;

    let mine = new_metrics(&pool, version, h2, 10.0).await;
    new_metrics(&pool, other_version, h2, 11.0).await;

    let metrics = MetricsRepo::list_by_algorithm(&pool, algorithm_id)
        .await
        .unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].id, mine);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn chart_join_keeps_versions_without_metrics(pool: PgPool) {
    let algorithm_id = new_algorithm(&pool, "vqe-chart", true).await;
    let first = new_version(&pool, algorithm_id, 1).await;
    let second = new_version(&pool, algorithm_id, 2).await;
    let third = new_version(&pool, algorithm_id, 3).await;
    let h2 = new_molecule(&pool, "H2").await;
    let lih = new_molecule(&pool, "LiH").await;

    new_metrics(&pool, first, h2, 30.0).await;
    new_metrics(&pool, second, lih, 25.0).await;
    new_metrics(&pool, third, h2, 20.0).await;

    let rows = MetricsRepo::version_metrics_for_molecule(&pool, algorithm_id, h2)
        .await
        .unwrap();

    let versions: Vec<i64> = rows.iter().map(|r| r.version_id).collect();
    assert_eq!(versions, vec![first, second, third]);
    assert_eq!(rows[0].iterations, Some(30.0));
    assert!(rows[1].metrics_id.is_none(), "second version has no H2 metrics");
    assert_eq!(rows[1].iterations, None);
    assert_eq!(rows[2].iterations, Some(20.0));
}
