//! Forecast values attached to tasks, and the parameters of a generation pass.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::health::HealthStatus;
use crate::time::{Duration, TimeUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    Task,
}

/// What a forecast was computed for. Only direct estimates carry a health status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type", default)]
    pub target_type: TargetType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<HealthStatus>,
}

impl Target {
    pub fn task(id: impl Into<String>) -> Self {
        Self {
            target_type: TargetType::Task,
            id: id.into(),
            health_status: None,
        }
    }

    pub fn with_health_status(mut self, health_status: HealthStatus) -> Self {
        self.health_status = Some(health_status);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    #[default]
    Member,
    MemberGroup,
}

impl FromStr for SubjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "member" => Ok(SubjectType::Member),
            "member_group" | "group" => Ok(SubjectType::MemberGroup),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid subject type '{}'. Expected: member, member-group",
                s
            ))),
        }
    }
}

/// Who the velocity, and therefore the forecast, belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "type", default)]
    pub subject_type: SubjectType,
    pub id: String,
}

impl Subject {
    pub fn member(id: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::Member,
            id: id.into(),
        }
    }

    pub fn member_group(id: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::MemberGroup,
            id: id.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject_type {
            SubjectType::Member => write!(f, "member {}", self.id),
            SubjectType::MemberGroup => write!(f, "group {}", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityStrategy {
    IdealVelocity,
    RealVelocity,
}

impl FromStr for VelocityStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ideal" | "ideal_velocity" => Ok(VelocityStrategy::IdealVelocity),
            "real" | "real_velocity" => Ok(VelocityStrategy::RealVelocity),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid velocity strategy '{}'. Expected: ideal, real",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryPointsStrategy {
    Direct,
    Cumulative,
}

impl FromStr for StoryPointsStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(StoryPointsStrategy::Direct),
            "cumulative" => Ok(StoryPointsStrategy::Cumulative),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid story points strategy '{}'. Expected: direct, cumulative",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub velocity: f64,
    pub estimation_time: Duration,
    pub target: Target,
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl Forecast {
    pub fn new(velocity: f64, estimation_time: Duration, target: Target, subject: Subject) -> Self {
        Self {
            velocity,
            estimation_time,
            target,
            subject,
            start_date: None,
            end_date: None,
        }
    }

    pub fn health_status(&self) -> Option<HealthStatus> {
        self.target.health_status
    }
}

/// Inputs of one generation pass; not mutated while the pass runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastGenerationParameters {
    pub velocity_strategy: VelocityStrategy,
    pub story_points_strategy: StoryPointsStrategy,
    pub subject: Subject,
    pub time_unit: TimeUnit,
    pub start_date: DateTime<Utc>,
}

impl ForecastGenerationParameters {
    pub fn new(subject: Subject, start_date: DateTime<Utc>) -> Self {
        Self {
            velocity_strategy: VelocityStrategy::RealVelocity,
            story_points_strategy: StoryPointsStrategy::Direct,
            subject,
            time_unit: TimeUnit::Day,
            start_date,
        }
    }

    pub fn velocity_strategy(mut self, strategy: VelocityStrategy) -> Self {
        self.velocity_strategy = strategy;
        self
    }

    pub fn story_points_strategy(mut self, strategy: StoryPointsStrategy) -> Self {
        self.story_points_strategy = strategy;
        self
    }

    pub fn time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }
}
