//! Forecast generation.
//!
//! A generation pass resolves one velocity for the requested subject and then
//! walks each tree three times:
//!
//! 1. direct estimates for every task with story points (pre-order)
//! 2. with the cumulative strategy, sums of child estimates for tasks that
//!    have no estimate of their own (post-order)
//! 3. start and end dates, laid out as one sequential timeline per root
//!
//! Without a usable velocity the pass does nothing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::estimation::EstimationTimeCalculator;
use crate::forecast::{
    Forecast, ForecastGenerationParameters, StoryPointsStrategy, Target, VelocityStrategy,
};
use crate::health::HealthStatusCalculator;
use crate::hierarchy::TaskHierarchyAssembler;
use crate::task::{HierarchyTraversalCriteria, Task, TaskSearchCriteria};
use crate::time::{Duration, TimePolicy, TimeUnit};
use crate::velocity::VelocityRepository;

/// Where the engine gets tasks from when it is handed ids.
#[async_trait]
pub trait ForecastTaskSource: Send + Sync {
    /// The requested tasks without their children
    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<Task>>;

    /// The requested tasks with their assembled subtrees
    async fn get_tasks_with_full_hierarchy(&self, task_ids: &[String]) -> Result<Vec<Task>>;
}

/// [`ForecastTaskSource`] backed by the hierarchy assembler.
pub struct HierarchyTaskSource {
    assembler: Arc<TaskHierarchyAssembler>,
    criteria: HierarchyTraversalCriteria,
}

impl HierarchyTaskSource {
    pub fn new(assembler: Arc<TaskHierarchyAssembler>, criteria: HierarchyTraversalCriteria) -> Self {
        Self { assembler, criteria }
    }
}

#[async_trait]
impl ForecastTaskSource for HierarchyTaskSource {
    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<Task>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut tasks = self
            .assembler
            .repository()
            .find_all(&TaskSearchCriteria::by_ids(task_ids.iter().cloned()))
            .await?;
        for task in tasks.iter_mut() {
            task.child_tasks = None;
        }
        self.assembler.metadata().populate_metadata_for_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn get_tasks_with_full_hierarchy(&self, task_ids: &[String]) -> Result<Vec<Task>> {
        self.assembler.assemble(task_ids, &self.criteria).await
    }
}

pub struct ForecastEngine {
    tasks: Arc<dyn ForecastTaskSource>,
    velocity: Arc<dyn VelocityRepository>,
    ideal_time_policy: TimePolicy,
}

impl ForecastEngine {
    pub fn new(
        tasks: Arc<dyn ForecastTaskSource>,
        velocity: Arc<dyn VelocityRepository>,
        ideal_time_policy: TimePolicy,
    ) -> Self {
        Self {
            tasks,
            velocity,
            ideal_time_policy,
        }
    }

    /// Resolve `task_ids` (flat for the direct strategy, as full hierarchies for
    /// the cumulative one) and forecast them.
    pub async fn generate_forecasts_for_task_ids(
        &self,
        task_ids: &[String],
        parameters: &ForecastGenerationParameters,
    ) -> Result<Vec<Task>> {
        let tasks = match parameters.story_points_strategy {
            StoryPointsStrategy::Direct => self.tasks.get_tasks(task_ids).await?,
            StoryPointsStrategy::Cumulative => self.tasks.get_tasks_with_full_hierarchy(task_ids).await?,
        };
        self.generate_forecasts_for_tasks(tasks, parameters).await
    }

    /// Attach forecasts to every task of `tasks`, replacing earlier ones.
    pub async fn generate_forecasts_for_tasks(
        &self,
        mut tasks: Vec<Task>,
        parameters: &ForecastGenerationParameters,
    ) -> Result<Vec<Task>> {
        let velocity = self
            .velocity
            .get_velocity(parameters.velocity_strategy, parameters.time_unit, &parameters.subject)
            .await?;
        let Some(velocity) = velocity.filter(|velocity| *velocity > 0.0) else {
            debug!(subject = %parameters.subject, "no usable velocity, skipping forecasts");
            return Ok(tasks);
        };

        for task in tasks.iter_mut() {
            populate_direct_forecasts(task, velocity, parameters);
        }

        if parameters.story_points_strategy == StoryPointsStrategy::Cumulative {
            for task in tasks.iter_mut() {
                aggregate_forecasts_bottom_up(task, velocity, parameters);
            }
        }

        for task in tasks.iter_mut() {
            self.schedule(task, parameters.start_date, parameters.velocity_strategy);
        }

        debug!(roots = tasks.len(), velocity, "generated forecasts");
        Ok(tasks)
    }

    /// Lay `task` and its forecast children out back to back from
    /// `current_start`; returns where the next sibling starts.
    fn schedule(&self, task: &mut Task, current_start: DateTime<Utc>, strategy: VelocityStrategy) -> DateTime<Utc> {
        if task.forecast.is_none() {
            return current_start;
        }

        let mut cursor = current_start;
        if let Some(children) = task.child_tasks.as_mut() {
            for child in children.iter_mut().filter(|child| child.forecast.is_some()) {
                cursor = self.schedule(child, cursor, strategy);
            }
        }

        let Some(forecast) = task.forecast.as_mut() else {
            return current_start;
        };
        let end = if cursor > current_start {
            Some(cursor)
        } else {
            self.duration_in_days(&forecast.estimation_time, strategy)
                .and_then(|offset| current_start.checked_add_signed(offset))
        };
        forecast.start_date = Some(current_start);
        forecast.end_date = end;

        // An end date outside the calendar stays unset and does not move the cursor.
        end.unwrap_or_else(|| {
            warn!(task = %task.id, estimate = %forecast.estimation_time, "end date out of range");
            current_start
        })
    }

    fn duration_in_days(&self, estimation_time: &Duration, strategy: VelocityStrategy) -> Option<chrono::Duration> {
        let policy = match strategy {
            VelocityStrategy::IdealVelocity => self.ideal_time_policy,
            VelocityStrategy::RealVelocity => TimePolicy::ALL_HOURS,
        };
        estimation_time.to_chrono(&policy)
    }
}

fn populate_direct_forecasts(task: &mut Task, velocity: f64, parameters: &ForecastGenerationParameters) {
    task.forecast = direct_forecast(task, velocity, parameters);
    if let Some(children) = task.child_tasks.as_mut() {
        for child in children.iter_mut() {
            populate_direct_forecasts(child, velocity, parameters);
        }
    }
}

// Zero story points are treated like missing ones.
fn direct_forecast(task: &Task, velocity: f64, parameters: &ForecastGenerationParameters) -> Option<Forecast> {
    let story_points = task.story_points.filter(|points| *points != 0.0)?;
    let estimation_time =
        EstimationTimeCalculator::estimate(Some(story_points), Some(velocity), parameters.time_unit)?;
    let health_status =
        HealthStatusCalculator::calculate(&estimation_time, task.time_tracking.total_spent_time.as_ref());

    Some(Forecast::new(
        velocity,
        estimation_time,
        Target::task(task.id.clone()).with_health_status(health_status),
        parameters.subject.clone(),
    ))
}

fn aggregate_forecasts_bottom_up(task: &mut Task, velocity: f64, parameters: &ForecastGenerationParameters) {
    let Some(children) = task.child_tasks.as_mut() else {
        return;
    };
    for child in children.iter_mut() {
        aggregate_forecasts_bottom_up(child, velocity, parameters);
    }

    if task.forecast.is_some() {
        return;
    }

    let total: f64 = children
        .iter()
        .map(|child| forecasted_amount(child, parameters.time_unit))
        .sum();
    if total <= 0.0 {
        return;
    }

    task.forecast = Some(Forecast::new(
        velocity,
        Duration::of(total, parameters.time_unit),
        Target::task(task.id.clone()),
        parameters.subject.clone(),
    ));
}

/// A child's estimate in `unit`; missing or non-positive estimates count as zero
fn forecasted_amount(task: &Task, unit: TimeUnit) -> f64 {
    task.forecast
        .as_ref()
        .map(|forecast| forecast.estimation_time.convert(unit, &TimePolicy::ALL_HOURS).amount)
        .filter(|amount| *amount > 0.0)
        .unwrap_or(0.0)
}
