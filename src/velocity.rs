//! Velocity lookup.
//!
//! Ideal velocity is derived from configuration: one story point costs
//! `story_points_to_ideal_hours_ratio` ideal hours, scaled by the member's
//! seniority multiplier. Real velocity comes from measured throughput.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, MeasuredVelocity, MemberConfig, SeniorityConfig};
use crate::error::Result;
use crate::forecast::{Subject, VelocityStrategy};
use crate::time::{Duration, TimePolicy, TimeUnit};

#[async_trait]
pub trait VelocityRepository: Send + Sync {
    /// Story points per one `time_unit` for `subject`, if known
    async fn get_velocity(
        &self,
        strategy: VelocityStrategy,
        time_unit: TimeUnit,
        subject: &Subject,
    ) -> Result<Option<f64>>;
}

#[derive(Debug, Clone)]
pub struct ConfiguredVelocityRepository {
    hours_per_story_point: f64,
    seniority: SeniorityConfig,
    default_level: String,
    members: BTreeMap<String, MemberConfig>,
    measured: BTreeMap<String, MeasuredVelocity>,
    ideal_time_policy: TimePolicy,
}

impl ConfiguredVelocityRepository {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hours_per_story_point: config.estimation.story_points_to_ideal_hours_ratio,
            seniority: config.seniority.clone(),
            default_level: config.estimation.default_seniority_level_when_missing.clone(),
            members: config.members.clone(),
            measured: config.velocity.measured.clone(),
            ideal_time_policy: config.ideal_time_policy(),
        }
    }

    /// Replace the measured velocity of `subject_id`
    pub fn with_measured(mut self, subject_id: impl Into<String>, measured: MeasuredVelocity) -> Self {
        self.measured.insert(subject_id.into(), measured);
        self
    }

    pub fn ideal_velocity(&self, member_id: &str, time_unit: TimeUnit) -> Option<f64> {
        if !(self.hours_per_story_point > 0.0) {
            return None;
        }

        let multiplier = self.seniority_multiplier(member_id).unwrap_or(1.0);
        let per_story_point = Duration::of(self.hours_per_story_point * multiplier, TimeUnit::Hour)
            .convert(time_unit, &self.ideal_time_policy);
        if !per_story_point.is_positive() {
            return None;
        }
        Some(1.0 / per_story_point.amount)
    }

    pub fn real_velocity(&self, subject_id: &str, time_unit: TimeUnit) -> Option<f64> {
        let measured = self.measured.get(subject_id)?;
        // Story points per measured unit, rescaled to story points per requested unit.
        let units_per_requested = Duration::of(1.0, time_unit)
            .convert(measured.unit, &self.ideal_time_policy)
            .amount;
        Some(measured.story_points * units_per_requested)
    }

    fn seniority_multiplier(&self, member_id: &str) -> Option<f64> {
        let level = self
            .members
            .get(member_id)
            .and_then(|member| member.level.as_deref())
            .unwrap_or(&self.default_level);
        self.seniority.levels.get(level).copied()
    }
}

#[async_trait]
impl VelocityRepository for ConfiguredVelocityRepository {
    async fn get_velocity(
        &self,
        strategy: VelocityStrategy,
        time_unit: TimeUnit,
        subject: &Subject,
    ) -> Result<Option<f64>> {
        let velocity = match strategy {
            VelocityStrategy::IdealVelocity => self.ideal_velocity(&subject.id, time_unit),
            VelocityStrategy::RealVelocity => self.real_velocity(&subject.id, time_unit),
        };
        debug!(subject = %subject, ?strategy, %time_unit, ?velocity, "resolved velocity");
        Ok(velocity)
    }
}
