//! Tunable simulation parameters.
use serde::{Deserialize, Serialize};

use crate::constants::{
    BALANCED_ENROLL_CAP, BALANCED_FINALS_CAP, COURSES_FIRST_ENROLL_CAP, COURSES_FIRST_FINALS_CAP,
    FINALS_FIRST_ENROLL_CAP, MAX_HORIZON_SEMESTERS, TERMS_PER_YEAR,
};
use crate::simulation::{SimulationError, StrategyId};

/// Per-semester load a strategy may take on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyCaps {
    /// `None` approves every final that can be taken.
    #[serde(default)]
    pub max_finals: Option<usize>,
    pub max_enrollments: usize,
}

impl StrategyCaps {
    #[must_use]
    pub const fn new(max_finals: Option<usize>, max_enrollments: usize) -> Self {
        Self {
            max_finals,
            max_enrollments,
        }
    }

    /// A plan under these caps can change the state.
    #[must_use]
    pub const fn can_progress(&self) -> bool {
        self.max_enrollments > 0 || !matches!(self.max_finals, Some(0))
    }
}

/// Strategy caps and calendar settings used by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_finals_first")]
    pub finals_first: StrategyCaps,
    #[serde(default = "SimulationConfig::default_courses_first")]
    pub courses_first: StrategyCaps,
    #[serde(default = "SimulationConfig::default_balanced")]
    pub balanced: StrategyCaps,
    #[serde(default = "SimulationConfig::default_terms_per_year")]
    pub terms_per_year: u32,
    #[serde(default = "SimulationConfig::default_max_horizon")]
    pub max_horizon: u32,
}

impl SimulationConfig {
    const fn default_finals_first() -> StrategyCaps {
        StrategyCaps::new(None, FINALS_FIRST_ENROLL_CAP)
    }

    const fn default_courses_first() -> StrategyCaps {
        StrategyCaps::new(Some(COURSES_FIRST_FINALS_CAP), COURSES_FIRST_ENROLL_CAP)
    }

    const fn default_balanced() -> StrategyCaps {
        StrategyCaps::new(Some(BALANCED_FINALS_CAP), BALANCED_ENROLL_CAP)
    }

    const fn default_terms_per_year() -> u32 {
        TERMS_PER_YEAR
    }

    const fn default_max_horizon() -> u32 {
        MAX_HORIZON_SEMESTERS
    }

    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError` when the JSON is malformed or a value is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub const fn caps(&self, strategy: StrategyId) -> StrategyCaps {
        match strategy {
            StrategyId::FinalsFirst => self.finals_first,
            StrategyId::CoursesFirst => self.courses_first,
            StrategyId::Balanced => self.balanced,
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError` when any field violates its bounds.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.terms_per_year == 0 {
            return Err(SimulationError::MinViolation {
                field: "terms_per_year",
                min: 1,
                value: 0,
            });
        }
        if self.max_horizon == 0 {
            return Err(SimulationError::MinViolation {
                field: "max_horizon",
                min: 1,
                value: 0,
            });
        }
        for strategy in StrategyId::ALL {
            if !self.caps(strategy).can_progress() {
                return Err(SimulationError::StalledStrategy(strategy));
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            finals_first: Self::default_finals_first(),
            courses_first: Self::default_courses_first(),
            balanced: Self::default_balanced(),
            terms_per_year: Self::default_terms_per_year(),
            max_horizon: Self::default_max_horizon(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_caps() {
        let config = SimulationConfig::default();
        assert_eq!(config.caps(StrategyId::FinalsFirst), StrategyCaps::new(None, 4));
        assert_eq!(config.caps(StrategyId::CoursesFirst), StrategyCaps::new(Some(2), 5));
        assert_eq!(config.caps(StrategyId::Balanced), StrategyCaps::new(Some(3), 3));
        assert_eq!(config.terms_per_year, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SimulationConfig::from_json(r#"{"balanced": {"maxFinals": 1, "maxEnrollments": 6}}"#)
                .unwrap();
        assert_eq!(config.balanced, StrategyCaps::new(Some(1), 6));
        assert_eq!(config.courses_first, StrategyCaps::new(Some(2), 5));
        assert_eq!(config.max_horizon, 40);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = SimulationConfig::from_json(r#"{"termsPerYear": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MinViolation {
                field: "terms_per_year",
                ..
            }
        ));

        let stalled = SimulationConfig::from_json(
            r#"{"coursesFirst": {"maxFinals": 0, "maxEnrollments": 0}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            stalled,
            SimulationError::StalledStrategy(StrategyId::CoursesFirst)
        ));

        assert!(matches!(
            SimulationConfig::from_json("{not json").unwrap_err(),
            SimulationError::Json(_)
        ));
    }
}
