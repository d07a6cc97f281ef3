//! Traffic-light health derived from spent versus estimated time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::{Duration, TimePolicy};

const GREEN_MAX_RATIO: f64 = 1.0;
const YELLOW_MAX_RATIO: f64 = 1.4;
const ORANGE_MAX_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Green,
    Yellow,
    Orange,
    Red,
    Gray,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Green => write!(f, "GREEN"),
            HealthStatus::Yellow => write!(f, "YELLOW"),
            HealthStatus::Orange => write!(f, "ORANGE"),
            HealthStatus::Red => write!(f, "RED"),
            HealthStatus::Gray => write!(f, "GRAY"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GREEN" => Ok(HealthStatus::Green),
            "YELLOW" => Ok(HealthStatus::Yellow),
            "ORANGE" => Ok(HealthStatus::Orange),
            "RED" => Ok(HealthStatus::Red),
            "GRAY" | "GREY" => Ok(HealthStatus::Gray),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid health status '{}'. Expected: GREEN, YELLOW, ORANGE, RED, GRAY",
                s
            ))),
        }
    }
}

pub struct HealthStatusCalculator;

impl HealthStatusCalculator {
    /// Classify `spent / estimate`, both measured in business-hour seconds.
    ///
    /// Nothing spent yet is always GREEN; a non-positive estimate is GRAY.
    pub fn calculate(estimation_time: &Duration, total_spent_time: Option<&Duration>) -> HealthStatus {
        let spent = match total_spent_time {
            Some(spent) if !spent.is_zero() => spent,
            _ => return HealthStatus::Green,
        };

        if !estimation_time.is_positive() {
            return HealthStatus::Gray;
        }

        let policy = TimePolicy::BUSINESS_HOURS;
        let ratio = spent.to_seconds(&policy) / estimation_time.to_seconds(&policy);

        if ratio <= GREEN_MAX_RATIO {
            HealthStatus::Green
        } else if ratio <= YELLOW_MAX_RATIO {
            HealthStatus::Yellow
        } else if ratio <= ORANGE_MAX_RATIO {
            HealthStatus::Orange
        } else {
            HealthStatus::Red
        }
    }
}
