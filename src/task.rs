//! Task model shared by the hierarchy assembler and the forecast engine.
//!
//! A [`Task`] exclusively owns its children, so every assembled result is a
//! proper tree. `child_tasks` is `None` until a backend has populated it;
//! filtering never leaves an empty list behind, it resets to `None` instead.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::forecast::Forecast;
use crate::time::Duration;

const DEFAULT_MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "todo" | "to_do" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid task status '{}'. Expected: todo, in_progress, done, blocked",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Assignee {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_group: Option<MemberGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeTracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_spent_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spent_time_by_assignee: BTreeMap<String, Duration>,
}

/// Raw values as reported by the tracker, before workflow mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub assignment: Assignment,
    #[serde(default)]
    pub time_tracking: TimeTracking,
    #[serde(default)]
    pub system_metadata: SystemMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_tasks: Option<Vec<Task>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Forecast>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::default(),
            stage: None,
            story_points: None,
            assignment: Assignment::default(),
            time_tracking: TimeTracking::default(),
            system_metadata: SystemMetadata::default(),
            child_tasks: None,
            forecast: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_original_status(mut self, original_status: impl Into<String>) -> Self {
        self.system_metadata.original_status = Some(original_status.into());
        self
    }

    pub fn with_story_points(mut self, story_points: f64) -> Self {
        self.story_points = Some(story_points);
        self
    }

    pub fn with_spent_time(mut self, spent: Duration) -> Self {
        self.time_tracking.total_spent_time = Some(spent);
        self
    }

    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignment.assignee = Some(assignee);
        self
    }

    pub fn with_children(mut self, children: Vec<Task>) -> Self {
        self.child_tasks = if children.is_empty() {
            None
        } else {
            Some(children)
        };
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn has_story_points(&self) -> bool {
        self.story_points.is_some_and(|points| points > 0.0)
    }

    /// Whether a backend has already populated this task's children
    pub fn has_children(&self) -> bool {
        self.child_tasks.as_ref().is_some_and(|children| !children.is_empty())
    }

    pub fn children(&self) -> &[Task] {
        self.child_tasks.as_deref().unwrap_or(&[])
    }

    /// Depth-first search for `id` in this subtree
    pub fn find(&self, id: &str) -> Option<&Task> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Number of levels in this subtree, counting this task as level 1
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Task::depth).max().unwrap_or(0)
    }

    /// Pre-order visit of every task in this subtree
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Task)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Task)) {
        visit(self);
        if let Some(children) = self.child_tasks.as_mut() {
            for child in children {
                child.walk_mut(visit);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_filter: Option<Vec<String>>,
}

impl TaskSearchCriteria {
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_filter: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn ids(&self) -> &[String] {
        self.id_filter.as_deref().unwrap_or(&[])
    }
}

/// Bounds for a hierarchy assembly. The requested root sits at depth 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyTraversalCriteria {
    pub max_depth: usize,
    pub exclude_done_tasks: bool,
    pub only_with_story_points: bool,
}

impl Default for HierarchyTraversalCriteria {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            exclude_done_tasks: true,
            only_with_story_points: false,
        }
    }
}

impl HierarchyTraversalCriteria {
    pub fn includes(&self, task: &Task) -> bool {
        if self.exclude_done_tasks && task.is_done() {
            return false;
        }
        if self.only_with_story_points && !task.has_story_points() {
            return false;
        }
        true
    }
}
