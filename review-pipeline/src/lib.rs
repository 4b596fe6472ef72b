//! review-pipeline: CLI crate over `review-pipeline-core`.
//!
//! All pipeline logic (checkpointed ingest, training, prediction) lives in
//! the core crate; this crate holds argument parsing, configuration-file
//! loading and process wiring.

pub mod cli;
pub mod load_config;
