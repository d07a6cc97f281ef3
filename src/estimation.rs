//! Story points to time conversion.

use crate::time::{Duration, TimeUnit};

pub struct EstimationTimeCalculator;

impl EstimationTimeCalculator {
    /// `story_points / velocity` expressed in `time_unit`.
    ///
    /// Returns `None` when either input is missing or the velocity is not
    /// positive. Story points are not validated.
    pub fn estimate(story_points: Option<f64>, velocity: Option<f64>, time_unit: TimeUnit) -> Option<Duration> {
        let story_points = story_points?;
        let velocity = velocity.filter(|v| *v > 0.0)?;
        Some(Duration::of(story_points / velocity, time_unit))
    }
}
