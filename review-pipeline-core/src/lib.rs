#![doc = "review-pipeline-core: core logic library for review-pipeline."]

//! This crate contains all logic, data models and pipelines for review-pipeline.
//! CLI glue, configuration-file parsing and process wiring live in the
//! `review-pipeline` binary crate, not here.
//!
//! # Usage
//! Add this as a dependency for all shared pipeline, checkpoint, model and
//! prediction code.

pub mod checkpoint;
pub mod config;
pub mod contract;
pub mod ingest;
pub mod model;
pub mod predict;
pub mod records;
pub mod store;
pub mod train;
