use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall performance grade of a production unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    Critical,
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Average => "average",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Both limits must hold for a unit to reach the tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierLimits {
    pub max_fcr: f64,
    pub min_survival: f64,
}

impl TierLimits {
    fn admits(&self, fcr: f64, survival_rate: f64) -> bool {
        fcr <= self.max_fcr && survival_rate >= self.min_survival
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub excellent: TierLimits,
    pub good: TierLimits,
    pub average: TierLimits,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            excellent: TierLimits { max_fcr: 1.5, min_survival: 95.0 },
            good: TierLimits { max_fcr: 2.0, min_survival: 90.0 },
            average: TierLimits { max_fcr: 2.5, min_survival: 85.0 },
        }
    }
}

/// Grades a unit with the standard thresholds.
pub fn classify_performance(fcr: f64, survival_rate: f64) -> PerformanceTier {
    classify_performance_with(fcr, survival_rate, &PerformanceThresholds::default())
}

/// Tiers are tried best first; the first one whose limits both hold wins.
pub fn classify_performance_with(
    fcr: f64,
    survival_rate: f64,
    thresholds: &PerformanceThresholds,
) -> PerformanceTier {
    [
        (PerformanceTier::Excellent, &thresholds.excellent),
        (PerformanceTier::Good, &thresholds.good),
        (PerformanceTier::Average, &thresholds.average),
    ]
    .into_iter()
    .find(|(_, limits)| limits.admits(fcr, survival_rate))
    .map_or(PerformanceTier::Critical, |(tier, _)| tier)
}
