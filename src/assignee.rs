//! Assignee lookup backed by a cache filled from assembled task trees.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{Assignee, Task};

#[derive(Debug, Default)]
pub struct AssigneeSearchService {
    cache: RwLock<HashMap<String, Assignee>>,
}

impl AssigneeSearchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_assignee_by_id(&self, assignee_id: &str) -> Option<Assignee> {
        self.read().get(assignee_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Record every assignee seen in `tasks` and their subtrees.
    ///
    /// Ids that only appear in per-assignee spent time get a placeholder entry
    /// named after the id, unless a full entry is already cached.
    pub fn populate_assignee_cache_from_tasks(&self, tasks: &[Task]) {
        let mut cache = self.write();
        let mut visited = HashSet::new();
        for task in tasks {
            Self::populate_from_task(&mut cache, task, &mut visited);
        }
    }

    fn populate_from_task(cache: &mut HashMap<String, Assignee>, task: &Task, visited: &mut HashSet<String>) {
        if !visited.insert(task.id.clone()) {
            return;
        }

        if let Some(assignee) = &task.assignment.assignee {
            cache.insert(assignee.id.clone(), assignee.clone());
        }

        for assignee_id in task.time_tracking.spent_time_by_assignee.keys() {
            cache
                .entry(assignee_id.clone())
                .or_insert_with(|| Assignee::new(assignee_id.clone(), assignee_id.clone()));
        }

        for child in task.children() {
            Self::populate_from_task(cache, child, visited);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Assignee>> {
        match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Assignee>> {
        match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
