//! Configuration loading and management
//!
//! Handles parsing of `.taskcast.toml` configuration files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;
use crate::task::HierarchyTraversalCriteria;
use crate::time::{TimePolicy, TimeUnit};

pub const CONFIG_FILE_NAME: &str = ".taskcast.toml";

const IDEAL_DAYS_PER_WEEK: f64 = 5.0;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracker workflow: raw status codes and stages
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Estimation constants
    #[serde(default)]
    pub estimation: EstimationConfig,

    /// Seniority multipliers
    #[serde(default)]
    pub seniority: SeniorityConfig,

    /// Per-member settings keyed by assignee id
    #[serde(default)]
    pub members: BTreeMap<String, MemberConfig>,

    /// Hierarchy bounds used when forecasting cumulative story points
    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    /// Measured velocities
    #[serde(default)]
    pub velocity: VelocityConfig,
}

/// Workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Stage name to the raw statuses that belong to it
    #[serde(default = "default_stages")]
    pub stages: BTreeMap<String, Vec<String>>,

    #[serde(default = "default_in_progress_status_codes")]
    pub in_progress_status_codes: Vec<String>,

    #[serde(default = "default_pending_status_codes")]
    pub pending_status_codes: Vec<String>,

    #[serde(default = "default_done_status_codes")]
    pub done_status_codes: Vec<String>,

    /// How long a finished task still counts as recently finished
    #[serde(default = "default_recently_finished_tasks_days")]
    pub recently_finished_tasks_days: u32,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn default_stages() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("Analysis".to_string(), strings(&["Analysis"])),
        (
            "Development".to_string(),
            strings(&["Active", "In Progress", "In Development", "Review"]),
        ),
        ("Validation".to_string(), strings(&["QA", "Validation", "Testing"])),
        ("Recently Finished".to_string(), strings(&["Done", "Closed", "Resolved"])),
        (
            "Pending".to_string(),
            strings(&["Blocked", "On Hold", "Pending", "Waiting"]),
        ),
    ])
}

fn default_in_progress_status_codes() -> Vec<String> {
    strings(&[
        "Analysis",
        "Active",
        "In Progress",
        "In Development",
        "QA",
        "Validation",
        "Testing",
        "Review",
    ])
}

fn default_pending_status_codes() -> Vec<String> {
    strings(&["Blocked", "On Hold", "Pending", "Waiting"])
}

fn default_done_status_codes() -> Vec<String> {
    strings(&["Done", "Closed", "Resolved"])
}

fn default_recently_finished_tasks_days() -> u32 {
    14
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            in_progress_status_codes: default_in_progress_status_codes(),
            pending_status_codes: default_pending_status_codes(),
            done_status_codes: default_done_status_codes(),
            recently_finished_tasks_days: default_recently_finished_tasks_days(),
        }
    }
}

/// Estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    #[serde(default = "default_working_days_per_month")]
    pub working_days_per_month: u32,

    /// Hours of focused work in an ideal day
    #[serde(default = "default_ideal_hours_per_day")]
    pub ideal_hours_per_day: f64,

    /// Ideal hours one story point takes before seniority scaling
    #[serde(default = "default_story_points_to_ideal_hours_ratio")]
    pub story_points_to_ideal_hours_ratio: f64,

    /// Kept for tracker adapters; the forecast engine does not read it
    #[serde(default)]
    pub default_story_points_value_when_missing: Option<f64>,

    #[serde(default = "default_seniority_level_when_missing")]
    pub default_seniority_level_when_missing: String,

    /// Kept for tracker adapters; the forecast engine does not read it
    #[serde(default = "default_health_status_when_missing")]
    pub default_health_status_when_missing: String,
}

fn default_working_days_per_month() -> u32 {
    22
}

fn default_ideal_hours_per_day() -> f64 {
    4.0
}

fn default_story_points_to_ideal_hours_ratio() -> f64 {
    1.0
}

fn default_seniority_level_when_missing() -> String {
    "middle".to_string()
}

fn default_health_status_when_missing() -> String {
    "GREEN".to_string()
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            working_days_per_month: default_working_days_per_month(),
            ideal_hours_per_day: default_ideal_hours_per_day(),
            story_points_to_ideal_hours_ratio: default_story_points_to_ideal_hours_ratio(),
            default_story_points_value_when_missing: None,
            default_seniority_level_when_missing: default_seniority_level_when_missing(),
            default_health_status_when_missing: default_health_status_when_missing(),
        }
    }
}

/// Seniority configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeniorityConfig {
    /// Level name to multiplier applied to hours per story point
    #[serde(default = "default_seniority_levels")]
    pub levels: BTreeMap<String, f64>,
}

fn default_seniority_levels() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("senior".to_string(), 1.0),
        ("middle".to_string(), 2.0),
        ("junior".to_string(), 4.0),
    ])
}

impl Default for SeniorityConfig {
    fn default() -> Self {
        Self {
            levels: default_seniority_levels(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberConfig {
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub member_groups: Vec<String>,
}

/// Hierarchy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_true")]
    pub exclude_done_tasks: bool,
}

fn default_max_depth() -> usize {
    HierarchyTraversalCriteria::default().max_depth
}

fn default_true() -> bool {
    true
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            exclude_done_tasks: true,
        }
    }
}

impl HierarchyConfig {
    pub fn criteria(&self) -> HierarchyTraversalCriteria {
        HierarchyTraversalCriteria {
            max_depth: self.max_depth,
            exclude_done_tasks: self.exclude_done_tasks,
            only_with_story_points: false,
        }
    }
}

/// Velocity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Measured velocity keyed by subject id
    #[serde(default)]
    pub measured: BTreeMap<String, MeasuredVelocity>,
}

/// Story points completed per one `unit` of time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeasuredVelocity {
    pub story_points: f64,
    #[serde(default = "default_measured_unit")]
    pub unit: TimeUnit,
}

fn default_measured_unit() -> TimeUnit {
    TimeUnit::Month
}

impl EstimationConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if !(self.ideal_hours_per_day > 0.0) {
            return Err(crate::error::Error::InvalidConfig(
                "estimation.ideal_hours_per_day must be positive".to_string(),
            ));
        }
        if self.working_days_per_month == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "estimation.working_days_per_month must be positive".to_string(),
            ));
        }
        self.default_health_status_when_missing
            .parse::<HealthStatus>()
            .map_err(|_| {
                crate::error::Error::InvalidConfig(format!(
                    "estimation.default_health_status_when_missing: invalid status '{}'",
                    self.default_health_status_when_missing
                ))
            })?;
        Ok(())
    }
}

impl SeniorityConfig {
    fn validate(&self) -> crate::error::Result<()> {
        for (level, multiplier) in &self.levels {
            if !(*multiplier > 0.0) {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "seniority.levels.{level}: multiplier must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `.taskcast.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `dir`, or return defaults when no file exists
    pub fn load_from_dir(dir: &Path) -> crate::error::Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve an explicit path or fall back to the working directory
    pub fn resolve(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let cwd = std::env::current_dir()?;
                Self::load_from_dir(&cwd)
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Calendar used to turn ideal-velocity estimates into days
    pub fn ideal_time_policy(&self) -> TimePolicy {
        TimePolicy::new(
            self.estimation.ideal_hours_per_day,
            IDEAL_DAYS_PER_WEEK,
            f64::from(self.estimation.working_days_per_month),
        )
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.estimation.validate()?;
        self.seniority.validate()?;
        if self.hierarchy.max_depth == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "hierarchy.max_depth must be at least 1".to_string(),
            ));
        }
        for (subject, measured) in &self.velocity.measured {
            if !measured.story_points.is_finite() {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "velocity.measured.{subject}: story_points must be a finite number"
                )));
            }
        }
        Ok(())
    }
}
