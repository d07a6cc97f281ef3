//! taskcast hierarchy command implementation
//!
//! Assembles the task trees below the requested ids and prints them.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::Backend;
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, format_task_tree, HumanOutput, OutputOptions};
use crate::task::Task;

/// Options for the hierarchy command
pub struct HierarchyOptions {
    pub ids: Vec<String>,
    pub tasks: PathBuf,
    pub max_depth: Option<usize>,
    pub include_done: bool,
    pub only_with_story_points: bool,
    pub fetch_mode: String,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct HierarchyReport {
    fetch_mode: String,
    max_depth: usize,
    backend_calls: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
    tasks: Vec<Task>,
}

pub async fn run(options: HierarchyOptions) -> Result<()> {
    let backend = Backend::open(&options.tasks, &options.fetch_mode, &options.config)?;

    let mut criteria = options.config.hierarchy.criteria();
    if let Some(max_depth) = options.max_depth {
        criteria.max_depth = max_depth;
    }
    if options.include_done {
        criteria.exclude_done_tasks = false;
    }
    criteria.only_with_story_points = options.only_with_story_points;

    let tasks = backend.assembler.assemble(&options.ids, &criteria).await?;
    let skipped = skipped_ids(&options.ids, &tasks);

    let report = HierarchyReport {
        fetch_mode: backend.repository.mode().to_string(),
        max_depth: criteria.max_depth,
        backend_calls: backend.repository.call_count(),
        skipped,
        tasks,
    };

    let mut human = HumanOutput::new(format!("Hierarchy ({} roots)", report.tasks.len()));
    human.push_summary("Fetch mode", report.fetch_mode.clone());
    human.push_summary("Max depth", report.max_depth.to_string());
    human.push_summary("Backend calls", report.backend_calls.to_string());
    for line in format_task_tree(&report.tasks) {
        human.push_detail(line);
    }
    for id in &report.skipped {
        human.push_warning(format!("{id}: not found or excluded by filters"));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "hierarchy",
        &report,
        Some(&human),
    )
}

/// Requested ids that produced no root
pub(crate) fn skipped_ids(requested: &[String], tasks: &[Task]) -> Vec<String> {
    requested
        .iter()
        .filter(|id| !tasks.iter().any(|task| &task.id == *id))
        .cloned()
        .collect()
}
