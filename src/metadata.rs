//! Raw tracker status to workflow status and stage.

use crate::config::WorkflowConfig;
use crate::task::{Task, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct TaskMetadataPopulator {
    workflow: WorkflowConfig,
}

impl TaskMetadataPopulator {
    pub fn new(workflow: WorkflowConfig) -> Self {
        Self { workflow }
    }

    /// Derive `status` and `stage` from the task's raw status.
    ///
    /// Tasks without a raw status keep whatever status the backend set.
    pub fn populate_metadata<'a>(&self, task: &'a mut Task) -> &'a mut Task {
        if let Some(original) = task.system_metadata.original_status.as_deref() {
            task.status = Self::map_status(&self.workflow, original);
            task.stage = Self::resolve_stage(&self.workflow, original);
        }
        task
    }

    pub fn populate_metadata_for_tasks<'a>(&self, tasks: &'a mut [Task]) -> &'a mut [Task] {
        for task in tasks.iter_mut() {
            self.populate_metadata(task);
        }
        tasks
    }

    /// Populate every task of every tree in `tasks`
    pub fn populate_metadata_recursive(&self, tasks: &mut [Task]) {
        for task in tasks.iter_mut() {
            task.walk_mut(&mut |node: &mut Task| {
                self.populate_metadata(node);
            });
        }
    }

    pub fn map_status(workflow: &WorkflowConfig, original_status: &str) -> TaskStatus {
        let matches = |codes: &[String]| codes.iter().any(|code| code == original_status);

        if original_status.is_empty() {
            TaskStatus::Todo
        } else if matches(&workflow.done_status_codes) {
            TaskStatus::Done
        } else if matches(&workflow.in_progress_status_codes) {
            TaskStatus::InProgress
        } else if matches(&workflow.pending_status_codes) {
            TaskStatus::Blocked
        } else {
            TaskStatus::Todo
        }
    }

    pub fn resolve_stage(workflow: &WorkflowConfig, original_status: &str) -> Option<String> {
        if original_status.is_empty() {
            return None;
        }
        workflow
            .stages
            .iter()
            .find(|(_, statuses)| statuses.iter().any(|status| status == original_status))
            .map(|(stage, _)| stage.clone())
    }
}
