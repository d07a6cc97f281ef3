#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use taskcast::assignee::AssigneeSearchService;
use taskcast::config::WorkflowConfig;
use taskcast::engine::ForecastTaskSource;
use taskcast::error::{Error, Result};
use taskcast::forecast::{Subject, VelocityStrategy};
use taskcast::hierarchy::TaskHierarchyAssembler;
use taskcast::metadata::TaskMetadataPopulator;
use taskcast::repository::TaskRepository;
use taskcast::task::{Task, TaskSearchCriteria, TaskStatus};
use taskcast::time::TimeUnit;
use tempfile::TempDir;

/// How much of a subtree one `find_all` hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    FullSubtree,
    OneLevel,
}

/// Backend over an explicit parent -> children graph.
///
/// The graph may contain shared children and cycles; every call is recorded.
pub struct ScriptedRepository {
    tasks: HashMap<String, Task>,
    edges: HashMap<String, Vec<String>>,
    shape: Shape,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRepository {
    pub fn new(shape: Shape) -> Self {
        Self {
            tasks: HashMap::new(),
            edges: HashMap::new(),
            shape,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.insert(task.id.clone(), task);
        self
    }

    pub fn edge(mut self, parent: &str, child: &str) -> Self {
        self.edges
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
        self
    }

    /// A linear chain `ids[0] -> ids[1] -> ...` of open tasks
    pub fn chain(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self = self.task(open(id));
        }
        for pair in ids.windows(2) {
            self = self.edge(pair[0], pair[1]);
        }
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn build(&self, id: &str, ancestors: &mut HashSet<String>, levels: Option<usize>) -> Option<Task> {
        let mut task = self.tasks.get(id)?.clone();
        if levels == Some(0) {
            return Some(task);
        }
        ancestors.insert(id.to_string());
        let mut children = Vec::new();
        for child in self.edges.get(id).into_iter().flatten() {
            if ancestors.contains(child) {
                continue;
            }
            if let Some(child) = self.build(child, ancestors, levels.map(|n| n - 1)) {
                children.push(child);
            }
        }
        ancestors.remove(id);
        task.child_tasks = (!children.is_empty()).then_some(children);
        Some(task)
    }
}

#[async_trait]
impl TaskRepository for ScriptedRepository {
    async fn find_all(&self, criteria: &TaskSearchCriteria) -> Result<Vec<Task>> {
        let ids = criteria.ids().to_vec();
        self.calls.lock().expect("calls lock").push(ids.clone());
        let levels = match self.shape {
            Shape::FullSubtree => None,
            Shape::OneLevel => Some(1),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.build(id, &mut HashSet::new(), levels))
            .collect())
    }
}

/// Backend that always fails
pub struct FailingRepository;

#[async_trait]
impl TaskRepository for FailingRepository {
    async fn find_all(&self, _criteria: &TaskSearchCriteria) -> Result<Vec<Task>> {
        Err(Error::Repository("tracker unavailable".to_string()))
    }
}

/// Velocity source returning one fixed value and recording lookups
pub struct StubVelocity {
    value: Option<f64>,
    lookups: Mutex<Vec<(VelocityStrategy, TimeUnit, String)>>,
}

impl StubVelocity {
    pub fn new(value: Option<f64>) -> Self {
        Self {
            value,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<(VelocityStrategy, TimeUnit, String)> {
        self.lookups.lock().expect("lookups lock").clone()
    }
}

#[async_trait]
impl taskcast::velocity::VelocityRepository for StubVelocity {
    async fn get_velocity(
        &self,
        strategy: VelocityStrategy,
        time_unit: TimeUnit,
        subject: &Subject,
    ) -> Result<Option<f64>> {
        self.lookups
            .lock()
            .expect("lookups lock")
            .push((strategy, time_unit, subject.id.clone()));
        Ok(self.value)
    }
}

/// Task source serving fixed flat and hierarchical answers
pub struct StaticTaskSource {
    pub flat: Vec<Task>,
    pub hierarchy: Vec<Task>,
    requests: Mutex<Vec<&'static str>>,
}

impl StaticTaskSource {
    pub fn new(flat: Vec<Task>, hierarchy: Vec<Task>) -> Self {
        Self {
            flat,
            hierarchy,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<&'static str> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ForecastTaskSource for StaticTaskSource {
    async fn get_tasks(&self, _task_ids: &[String]) -> Result<Vec<Task>> {
        self.requests.lock().expect("requests lock").push("flat");
        Ok(self.flat.clone())
    }

    async fn get_tasks_with_full_hierarchy(&self, _task_ids: &[String]) -> Result<Vec<Task>> {
        self.requests.lock().expect("requests lock").push("hierarchy");
        Ok(self.hierarchy.clone())
    }
}

pub fn open(id: &str) -> Task {
    Task::new(id, format!("task {id}"))
}

pub fn done(id: &str) -> Task {
    open(id).with_status(TaskStatus::Done)
}

pub fn sized(id: &str, story_points: f64) -> Task {
    open(id).with_story_points(story_points)
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn assembler(repository: Arc<dyn TaskRepository>) -> TaskHierarchyAssembler {
    TaskHierarchyAssembler::new(
        repository,
        TaskMetadataPopulator::new(WorkflowConfig::default()),
        Arc::new(AssigneeSearchService::new()),
    )
}

/// Every id in the forest, pre-order
pub fn all_ids(tasks: &[Task]) -> Vec<String> {
    let mut out = Vec::new();
    for task in tasks {
        task.walk(&mut |node| out.push(node.id.clone()));
    }
    out
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}

pub fn assert_same_instant(actual: Option<DateTime<Utc>>, expected: DateTime<Utc>) {
    let actual = actual.expect("date is set");
    let delta = (actual - expected).num_milliseconds().abs();
    assert!(delta <= 1, "expected {expected}, got {actual}");
}

/// Temporary directory holding a task dump for CLI runs
pub struct TaskDump {
    dir: TempDir,
}

impl TaskDump {
    pub fn new(records: &serde_json::Value) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        fs::write(
            dir.path().join("tasks.json"),
            serde_json::to_string_pretty(records).expect("serialize records"),
        )
        .expect("write task dump");
        Self { dir }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join(".taskcast.toml");
        fs::write(&path, contents).expect("write config");
        path
    }
}
