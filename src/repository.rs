//! Task backends.
//!
//! [`TaskRepository`] is the only seam the assembler talks to. Trackers differ
//! in what one `find_all` returns: some hand back each task with its whole
//! subtree, others only with its direct children. [`JsonTaskRepository`] serves
//! a flat task dump in either shape, selected by [`FetchMode`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Assignee, Task, TaskSearchCriteria, TaskStatus};
use crate::time::{Duration, TimeUnit};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Fetch the tasks named by `criteria`. Children may or may not be populated.
    async fn find_all(&self, criteria: &TaskSearchCriteria) -> Result<Vec<Task>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Every task arrives with its complete subtree
    FullSubtree,
    /// Every task arrives with its direct children only
    #[default]
    DirectChildren,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::FullSubtree => write!(f, "full"),
            FetchMode::DirectChildren => write!(f, "incremental"),
        }
    }
}

impl FromStr for FetchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" | "full-subtree" | "subtree" => Ok(FetchMode::FullSubtree),
            "incremental" | "direct-children" | "children" => Ok(FetchMode::DirectChildren),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid fetch mode '{}'. Expected: full, incremental",
                s
            ))),
        }
    }
}

/// One line of a task dump. Hierarchy is expressed through `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

impl TaskRecord {
    fn to_task(&self) -> Task {
        let mut task = Task::new(self.id.clone(), self.title.clone());
        task.status = self.status.unwrap_or_default();
        task.story_points = self.story_points;
        task.system_metadata.original_status = self.original_status.clone();
        task.system_metadata.project_key = self.project_key.clone();
        if let Some(hours) = self.spent_hours {
            let spent = Duration::of(hours, TimeUnit::Hour);
            task.time_tracking.total_spent_time = Some(spent);
            if let Some(assignee) = &self.assignee {
                task.time_tracking
                    .spent_time_by_assignee
                    .insert(assignee.clone(), spent);
            }
        }
        if let Some(assignee) = &self.assignee {
            let name = self.assignee_name.clone().unwrap_or_else(|| assignee.clone());
            task.assignment.assignee = Some(Assignee::new(assignee.clone(), name));
        }
        task
    }
}

/// In-memory backend over a flat list of [`TaskRecord`]s.
#[derive(Debug)]
pub struct JsonTaskRepository {
    records: Vec<TaskRecord>,
    index: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    mode: FetchMode,
    calls: AtomicUsize,
}

impl JsonTaskRepository {
    pub fn from_records(records: Vec<TaskRecord>, mode: FetchMode) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), position).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "duplicate task id '{}' in task dump",
                    record.id
                )));
            }
            if let Some(parent) = &record.parent_id {
                children.entry(parent.clone()).or_default().push(position);
            }
        }

        Ok(Self {
            records,
            index,
            children,
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    /// Load a JSON array of task records
    pub fn load(path: &Path, mode: FetchMode) -> Result<Self> {
        if !path.exists() {
            return Err(Error::TaskFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let records: Vec<TaskRecord> = serde_json::from_str(&content)?;
        Self::from_records(records, mode)
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Number of `find_all` calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn direct_children(&self, id: &str) -> Vec<Task> {
        self.children
            .get(id)
            .map(|positions| positions.iter().map(|&p| self.records[p].to_task()).collect())
            .unwrap_or_default()
    }

    fn subtree(&self, position: usize, ancestors: &mut HashSet<String>) -> Task {
        let record = &self.records[position];
        let task = record.to_task();
        ancestors.insert(record.id.clone());
        let mut children = Vec::new();
        for &child in self.children.get(&record.id).into_iter().flatten() {
            if !ancestors.contains(&self.records[child].id) {
                children.push(self.subtree(child, ancestors));
            }
        }
        ancestors.remove(&record.id);
        task.with_children(children)
    }

    fn fetch(&self, id: &str) -> Option<Task> {
        let position = *self.index.get(id)?;
        let task = match self.mode {
            FetchMode::FullSubtree => self.subtree(position, &mut HashSet::new()),
            FetchMode::DirectChildren => self.records[position]
                .to_task()
                .with_children(self.direct_children(id)),
        };
        Some(task)
    }
}

#[async_trait]
impl TaskRepository for JsonTaskRepository {
    async fn find_all(&self, criteria: &TaskSearchCriteria) -> Result<Vec<Task>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let tasks = match &criteria.id_filter {
            Some(ids) => ids.iter().filter_map(|id| self.fetch(id)).collect(),
            None => self.records.iter().map(TaskRecord::to_task).collect(),
        };
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parent: Option<&str>) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("task {id}"),
            status: None,
            original_status: None,
            story_points: None,
            spent_hours: None,
            parent_id: parent.map(str::to_string),
            assignee: None,
            assignee_name: None,
            project_key: None,
        }
    }

    fn chain() -> Vec<TaskRecord> {
        vec![
            record("E-1", None),
            record("S-1", Some("E-1")),
            record("S-2", Some("E-1")),
            record("T-1", Some("S-1")),
        ]
    }

    #[tokio::test]
    async fn full_subtree_mode_nests_all_levels() {
        let repo = JsonTaskRepository::from_records(chain(), FetchMode::FullSubtree).unwrap();
        let tasks = repo.find_all(&TaskSearchCriteria::by_ids(["E-1"])).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].depth(), 3);
        assert!(tasks[0].find("T-1").is_some());
    }

    #[tokio::test]
    async fn direct_children_mode_returns_one_level() {
        let repo = JsonTaskRepository::from_records(chain(), FetchMode::DirectChildren).unwrap();
        let tasks = repo.find_all(&TaskSearchCriteria::by_ids(["E-1"])).await.unwrap();
        assert_eq!(tasks[0].depth(), 2);
        assert!(tasks[0].children().iter().all(|child| child.child_tasks.is_none()));
        assert_eq!(repo.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_skipped() {
        let repo = JsonTaskRepository::from_records(chain(), FetchMode::DirectChildren).unwrap();
        let tasks = repo
            .find_all(&TaskSearchCriteria::by_ids(["NOPE", "S-2"]))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "S-2");
    }

    #[tokio::test]
    async fn cyclic_parents_terminate_in_full_mode() {
        let records = vec![record("A", Some("B")), record("B", Some("A"))];
        let repo = JsonTaskRepository::from_records(records, FetchMode::FullSubtree).unwrap();
        let tasks = repo.find_all(&TaskSearchCriteria::by_ids(["A"])).await.unwrap();
        assert_eq!(tasks[0].depth(), 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let records = vec![record("A", None), record("A", None)];
        assert!(JsonTaskRepository::from_records(records, FetchMode::FullSubtree).is_err());
    }

    #[test]
    fn spent_hours_are_attributed_to_assignee() {
        let mut rec = record("A", None);
        rec.spent_hours = Some(3.0);
        rec.assignee = Some("alice".to_string());
        let task = rec.to_task();
        assert_eq!(task.time_tracking.total_spent_time, Some(Duration::of(3.0, TimeUnit::Hour)));
        assert!(task.time_tracking.spent_time_by_assignee.contains_key("alice"));
        assert_eq!(task.assignment.assignee.map(|a| a.display_name), Some("alice".to_string()));
    }
}
