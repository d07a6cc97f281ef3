//! taskcast forecast command implementation
//!
//! Resolves the requested tasks, attaches forecasts and prints the result.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::cli::hierarchy::skipped_ids;
use crate::cli::Backend;
use crate::config::{Config, MeasuredVelocity};
use crate::engine::{ForecastEngine, HierarchyTaskSource};
use crate::error::{Error, Result};
use crate::forecast::{
    ForecastGenerationParameters, StoryPointsStrategy, Subject, SubjectType, VelocityStrategy,
};
use crate::output::{emit_success, format_task_tree, HumanOutput, OutputOptions};
use crate::task::Task;
use crate::time::TimeUnit;
use crate::velocity::ConfiguredVelocityRepository;

/// Options for the forecast command
pub struct ForecastOptions {
    pub ids: Vec<String>,
    pub tasks: PathBuf,
    pub subject: String,
    pub subject_type: String,
    pub velocity_strategy: String,
    pub story_points: String,
    pub unit: String,
    pub start: Option<String>,
    pub velocity: Option<f64>,
    pub fetch_mode: String,
    pub config: Config,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ForecastReport {
    subject: Subject,
    velocity_strategy: VelocityStrategy,
    story_points_strategy: StoryPointsStrategy,
    time_unit: TimeUnit,
    start_date: DateTime<Utc>,
    forecasted: usize,
    backend_calls: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
    tasks: Vec<Task>,
}

pub async fn run(options: ForecastOptions) -> Result<()> {
    let subject_type: SubjectType = options.subject_type.parse()?;
    let subject = match subject_type {
        SubjectType::Member => Subject::member(options.subject.clone()),
        SubjectType::MemberGroup => Subject::member_group(options.subject.clone()),
    };
    let time_unit: TimeUnit = options.unit.parse()?;
    let start_date = parse_start(options.start.as_deref())?;
    let parameters = ForecastGenerationParameters::new(subject.clone(), start_date)
        .velocity_strategy(options.velocity_strategy.parse()?)
        .story_points_strategy(options.story_points.parse()?)
        .time_unit(time_unit);

    let backend = Backend::open(&options.tasks, &options.fetch_mode, &options.config)?;

    let mut velocity = ConfiguredVelocityRepository::from_config(&options.config);
    if let Some(story_points) = options.velocity {
        velocity = velocity.with_measured(
            subject.id.clone(),
            MeasuredVelocity {
                story_points,
                unit: time_unit,
            },
        );
    }

    let source = HierarchyTaskSource::new(
        backend.assembler.clone(),
        options.config.hierarchy.criteria(),
    );
    let engine = ForecastEngine::new(
        Arc::new(source),
        Arc::new(velocity),
        options.config.ideal_time_policy(),
    );

    let tasks = engine
        .generate_forecasts_for_task_ids(&options.ids, &parameters)
        .await?;
    let forecasted: usize = tasks
        .iter()
        .map(|task| {
            let mut count = 0usize;
            task.walk(&mut |node| {
                if node.forecast.is_some() {
                    count += 1;
                }
            });
            count
        })
        .sum();
    debug!(forecasted, "forecast command finished");

    let report = ForecastReport {
        subject,
        velocity_strategy: parameters.velocity_strategy,
        story_points_strategy: parameters.story_points_strategy,
        time_unit,
        start_date,
        forecasted,
        backend_calls: backend.repository.call_count(),
        skipped: skipped_ids(&options.ids, &tasks),
        tasks,
    };

    let mut human = HumanOutput::new(format!("Forecast for {}", report.subject));
    human.push_summary("Start", report.start_date.to_rfc3339());
    human.push_summary("Unit", report.time_unit.to_string());
    human.push_summary("Forecasted tasks", report.forecasted.to_string());
    for line in format_task_tree(&report.tasks) {
        human.push_detail(line);
    }
    if report.forecasted == 0 && !report.tasks.is_empty() {
        human.push_warning("no forecasts produced; check velocity and story points");
    }
    for id in &report.skipped {
        human.push_warning(format!("{id}: not found or excluded by filters"));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "forecast",
        &report,
        Some(&human),
    )
}

fn parse_start(raw: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date| date.with_timezone(&Utc))
        .map_err(|err| Error::InvalidArgument(format!("Invalid start date '{raw}': {err}")))
}
