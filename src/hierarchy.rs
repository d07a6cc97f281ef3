//! Task tree assembly.
//!
//! Trees are grown level by level. Each round asks the repository, in a single
//! call, for the children of every task on the current level that has none
//! yet, then claims the next level in order. Children a backend already
//! attached are claimed the same way, so a backend that returns whole subtrees
//! and one that returns a level per call produce the same tree.
//!
//! Invariants of an assembled tree, with the requested root at depth 1:
//! - no node is deeper than `max_depth`, and nodes at `max_depth` have no children
//! - a task id occurs at most once
//! - with `exclude_done_tasks`, no DONE task occurs, nor anything below one

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::assignee::AssigneeSearchService;
use crate::error::Result;
use crate::metadata::TaskMetadataPopulator;
use crate::repository::TaskRepository;
use crate::task::{HierarchyTraversalCriteria, Task, TaskSearchCriteria};

/// Index path from a root to one of its descendants
type NodePath = Vec<usize>;

pub struct TaskHierarchyAssembler {
    repository: Arc<dyn TaskRepository>,
    metadata: TaskMetadataPopulator,
    assignees: Arc<AssigneeSearchService>,
}

impl TaskHierarchyAssembler {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        metadata: TaskMetadataPopulator,
        assignees: Arc<AssigneeSearchService>,
    ) -> Self {
        Self {
            repository,
            metadata,
            assignees,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repository
    }

    pub fn metadata(&self) -> &TaskMetadataPopulator {
        &self.metadata
    }

    /// Build one tree per requested id.
    ///
    /// Roots that fail `criteria` (a DONE root while excluding done tasks, or an
    /// unsized root while requiring story points) are left out of the result.
    /// Repository errors are returned as-is.
    pub async fn assemble(&self, task_ids: &[String], criteria: &HierarchyTraversalCriteria) -> Result<Vec<Task>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let roots = self
            .repository
            .find_all(&TaskSearchCriteria::by_ids(task_ids.iter().cloned()))
            .await?;
        let max_depth = criteria.max_depth.max(1);

        let mut assembled = Vec::with_capacity(roots.len());
        for mut root in roots {
            self.metadata.populate_metadata(&mut root);
            if !criteria.includes(&root) {
                debug!(task = %root.id, status = %root.status, "root excluded by criteria");
                continue;
            }

            self.expand(&mut root, criteria, max_depth).await?;
            prune_to_depth(&mut root, 1, max_depth);
            self.metadata
                .populate_metadata_recursive(std::slice::from_mut(&mut root));
            filter_children(&mut root, criteria);

            debug!(task = %root.id, levels = root.depth(), "assembled hierarchy");
            assembled.push(root);
        }

        self.assignees.populate_assignee_cache_from_tasks(&assembled);
        Ok(assembled)
    }

    /// Grow `root` one level per round, up to `max_depth`.
    ///
    /// Children are claimed level by level across the whole frontier, whether
    /// the backend attached them up front or they were fetched in this round,
    /// so a repeated id always keeps its shallowest occurrence.
    async fn expand(&self, root: &mut Task, criteria: &HierarchyTraversalCriteria, max_depth: usize) -> Result<()> {
        let mut visited = HashSet::from([root.id.clone()]);
        let mut level: Vec<NodePath> = vec![Vec::new()];
        let mut depth = 1usize;

        while !level.is_empty() && depth < max_depth {
            self.fetch_missing_children(root, &level, criteria, depth).await?;

            let mut next = Vec::new();
            for path in &level {
                let Some(node) = node_at_mut(root, path) else {
                    continue;
                };
                let Some(children) = node.child_tasks.take() else {
                    continue;
                };
                // excluded tasks leave the tree with their whole subtree
                if !criteria.includes(node) {
                    continue;
                }

                let mut kept = Vec::with_capacity(children.len());
                for mut child in children {
                    if !visited.insert(child.id.clone()) {
                        warn!(parent = %node.id, task = %child.id, "dropping repeated task id");
                        continue;
                    }
                    self.metadata.populate_metadata(&mut child);
                    kept.push(child);
                }

                for position in 0..kept.len() {
                    let mut child_path = path.clone();
                    child_path.push(position);
                    next.push(child_path);
                }
                node.child_tasks = (!kept.is_empty()).then_some(kept);
            }

            level = next;
            depth += 1;
        }

        Ok(())
    }

    /// Fetch, in one call, the children of every task on `level` that is
    /// still childless and will survive filtering.
    async fn fetch_missing_children(
        &self,
        root: &mut Task,
        level: &[NodePath],
        criteria: &HierarchyTraversalCriteria,
        depth: usize,
    ) -> Result<()> {
        let pending: Vec<(NodePath, String)> = level
            .iter()
            .filter_map(|path| {
                let node = node_at(root, path)?;
                (!node.has_children() && criteria.includes(node)).then(|| (path.clone(), node.id.clone()))
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        debug!(root = %root.id, depth, batch = pending.len(), "fetching children");
        let fetched = self
            .repository
            .find_all(&TaskSearchCriteria::by_ids(pending.iter().map(|(_, id)| id.clone())))
            .await?;
        let mut children_by_parent: HashMap<String, Vec<Task>> = HashMap::new();
        for task in fetched {
            if let Some(children) = task.child_tasks.filter(|children| !children.is_empty()) {
                children_by_parent.entry(task.id).or_insert(children);
            }
        }

        for (path, id) in pending {
            if let (Some(node), Some(children)) = (node_at_mut(root, &path), children_by_parent.remove(&id)) {
                node.child_tasks = Some(children);
            }
        }
        Ok(())
    }
}

fn node_at<'a>(root: &'a Task, path: &[usize]) -> Option<&'a Task> {
    path.iter()
        .try_fold(root, |node, &position| node.child_tasks.as_ref()?.get(position))
}

fn node_at_mut<'a>(root: &'a mut Task, path: &[usize]) -> Option<&'a mut Task> {
    path.iter()
        .try_fold(root, |node, &position| node.child_tasks.as_mut()?.get_mut(position))
}

fn prune_to_depth(task: &mut Task, depth: usize, max_depth: usize) {
    if depth >= max_depth {
        task.child_tasks = None;
        return;
    }
    if let Some(children) = task.child_tasks.as_mut() {
        for child in children {
            prune_to_depth(child, depth + 1, max_depth);
        }
    }
}

/// Drop children failing `criteria` together with their whole subtrees.
fn filter_children(task: &mut Task, criteria: &HierarchyTraversalCriteria) {
    let Some(children) = task.child_tasks.take() else {
        return;
    };

    let kept: Vec<Task> = children
        .into_iter()
        .filter(|child| criteria.includes(child))
        .map(|mut child| {
            filter_children(&mut child, criteria);
            child
        })
        .collect();
    task.child_tasks = (!kept.is_empty()).then_some(kept);
}
