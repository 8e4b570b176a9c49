//! qbench benchmark worker.
//!
//! Pulls `benchmark.benchmark_task` messages off the Celery queue, runs the
//! VQE benchmark through the external library, posts the outcome to the
//! result callback and removes the artifacts the library leaves behind.

pub mod broker;
pub mod callback;
pub mod celery;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod runner;
pub mod task;
