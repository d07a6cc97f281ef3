//! taskcast - Task Hierarchy and Forecast Library
//!
//! This library provides the core functionality for the taskcast CLI tool:
//! assembling task trees from a tracker and projecting effort and dates from
//! story points and velocity.
//!
//! # Core Concepts
//!
//! - **Hierarchies**: Depth-bounded task trees assembled with batched fetches
//! - **Estimates**: Story points divided by velocity, in a chosen time unit
//! - **Health**: How spent time compares with the estimate
//! - **Forecasts**: Estimates plus sequential start and end dates
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskcast.toml`
//! - `error`: Error types and result aliases
//! - `time`: Time units, policies and unit-aware durations
//! - `task`: Task model and search criteria
//! - `repository`: Task backends
//! - `metadata`: Workflow status and stage mapping
//! - `assignee`: Assignee cache
//! - `hierarchy`: Task tree assembly
//! - `estimation`: Story points to estimated time
//! - `health`: Health status from estimate and spent time
//! - `forecast`: Forecast values and generation parameters
//! - `velocity`: Velocity lookup
//! - `engine`: Forecast generation and scheduling
//! - `output`: Human and JSON output

pub mod assignee;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimation;
pub mod forecast;
pub mod health;
pub mod hierarchy;
pub mod metadata;
pub mod output;
pub mod repository;
pub mod task;
pub mod time;
pub mod velocity;

pub use error::{Error, Result};
