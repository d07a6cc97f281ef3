//! Command-line interface for taskcast
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::assignee::AssigneeSearchService;
use crate::config::Config;
use crate::error::Result;
use crate::hierarchy::TaskHierarchyAssembler;
use crate::metadata::TaskMetadataPopulator;
use crate::repository::{FetchMode, JsonTaskRepository};

mod forecast;
mod hierarchy;

/// taskcast - task hierarchies and completion forecasts
///
/// Assembles task trees from a tracker dump and projects how long they take
/// from story points and velocity.
#[derive(Parser, Debug)]
#[command(name = "taskcast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./.taskcast.toml)
    #[arg(long, global = true, env = "TASKCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble task trees below the given ids
    Hierarchy {
        /// Root task ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// JSON task dump serving as the tracker backend
        #[arg(long, env = "TASKCAST_TASKS")]
        tasks: PathBuf,

        /// Levels to assemble, counting the root as level 1
        #[arg(long)]
        max_depth: Option<usize>,

        /// Keep done tasks and their subtrees
        #[arg(long)]
        include_done: bool,

        /// Keep only tasks with positive story points
        #[arg(long)]
        only_with_story_points: bool,

        /// Backend behaviour: full (whole subtrees) or incremental (one level per call)
        #[arg(long, default_value = "incremental")]
        fetch_mode: String,
    },

    /// Forecast effort and dates for the given ids
    Forecast {
        /// Task ids to forecast
        #[arg(required = true)]
        ids: Vec<String>,

        /// JSON task dump serving as the tracker backend
        #[arg(long, env = "TASKCAST_TASKS")]
        tasks: PathBuf,

        /// Member or member group the velocity belongs to
        #[arg(long)]
        subject: String,

        /// Subject type: member, member-group
        #[arg(long, default_value = "member")]
        subject_type: String,

        /// Velocity strategy: ideal, real
        #[arg(long, default_value = "real")]
        velocity_strategy: String,

        /// Story points strategy: direct, cumulative
        #[arg(long, default_value = "direct")]
        story_points: String,

        /// Unit estimates are expressed in: hour, day, week, month
        #[arg(long, default_value = "day")]
        unit: String,

        /// Schedule start (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<String>,

        /// Measured velocity override for the subject, in story points per --unit
        #[arg(long)]
        velocity: Option<f64>,

        /// Backend behaviour: full (whole subtrees) or incremental (one level per call)
        #[arg(long, default_value = "incremental")]
        fetch_mode: String,
    },
}

/// Backend and assembler wired from a task dump and configuration
pub(crate) struct Backend {
    pub repository: Arc<JsonTaskRepository>,
    pub assembler: Arc<TaskHierarchyAssembler>,
}

impl Backend {
    pub(crate) fn open(tasks: &Path, fetch_mode: &str, config: &Config) -> Result<Self> {
        let mode: FetchMode = fetch_mode.parse()?;
        let repository = Arc::new(JsonTaskRepository::load(tasks, mode)?);
        let assembler = Arc::new(TaskHierarchyAssembler::new(
            repository.clone(),
            TaskMetadataPopulator::new(config.workflow.clone()),
            Arc::new(AssigneeSearchService::new()),
        ));
        Ok(Self {
            repository,
            assembler,
        })
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let config = Config::resolve(self.config.as_ref())?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        match self.command {
            Commands::Hierarchy {
                ids,
                tasks,
                max_depth,
                include_done,
                only_with_story_points,
                fetch_mode,
            } => runtime.block_on(hierarchy::run(hierarchy::HierarchyOptions {
                ids,
                tasks,
                max_depth,
                include_done,
                only_with_story_points,
                fetch_mode,
                config,
                json: self.json,
                quiet: self.quiet,
            })),
            Commands::Forecast {
                ids,
                tasks,
                subject,
                subject_type,
                velocity_strategy,
                story_points,
                unit,
                start,
                velocity,
                fetch_mode,
            } => runtime.block_on(forecast::run(forecast::ForecastOptions {
                ids,
                tasks,
                subject,
                subject_type,
                velocity_strategy,
                story_points,
                unit,
                start,
                velocity,
                fetch_mode,
                config,
                json: self.json,
                quiet: self.quiet,
            })),
        }
    }
}
