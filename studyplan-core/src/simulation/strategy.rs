//! Advancement strategies: which finals to sit and which courses to take.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::SubjectId;
use crate::simulation::{SimulationConfig, SimulationError, StrategyCaps};
use crate::status::StatusMap;

/// Built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    /// Sit every available final, then take a moderate course load.
    #[serde(alias = "finals")]
    FinalsFirst,
    /// Take a heavy course load and sit only a couple of finals.
    #[serde(alias = "courses")]
    CoursesFirst,
    /// Split the term evenly between finals and courses.
    Balanced,
}

impl StrategyId {
    pub const ALL: [Self; 3] = [Self::FinalsFirst, Self::CoursesFirst, Self::Balanced];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FinalsFirst => "finals-first",
            Self::CoursesFirst => "courses-first",
            Self::Balanced => "balanced",
        }
    }

    #[must_use]
    pub fn create_policy(self, config: &SimulationConfig) -> Box<dyn AdvancementPolicy> {
        Box::new(CappedPolicy {
            strategy: self,
            caps: config.caps(self),
        })
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyId {
    type Err = SimulationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "finals-first" | "finals" => Ok(Self::FinalsFirst),
            "courses-first" | "courses" => Ok(Self::CoursesFirst),
            "balanced" => Ok(Self::Balanced),
            _ => Err(SimulationError::UnknownStrategy(value.to_string())),
        }
    }
}

/// A pending final that can be sat this semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalCandidate {
    pub id: SubjectId,
    /// Not-started subjects listing this one as a course prerequisite.
    pub impact: usize,
}

/// Decisions for one semester.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterPlan {
    pub approve: Vec<SubjectId>,
    pub enroll: Vec<SubjectId>,
}

/// Policy interface for simulated advancement.
///
/// `finals` arrive sorted by impact (highest first) and `enrollable` in
/// catalog order. Ids outside those lists are discarded by the simulator.
pub trait AdvancementPolicy {
    /// Name used for logging and reports.
    fn name(&self) -> &'static str;

    fn plan(
        &self,
        state: &StatusMap,
        finals: &[FinalCandidate],
        enrollable: &[SubjectId],
    ) -> SemesterPlan;
}

/// Take finals and courses in the order offered, up to the strategy caps.
#[derive(Debug, Clone, Copy)]
struct CappedPolicy {
    strategy: StrategyId,
    caps: StrategyCaps,
}

impl AdvancementPolicy for CappedPolicy {
    fn name(&self) -> &'static str {
        self.strategy.label()
    }

    fn plan(
        &self,
        _state: &StatusMap,
        finals: &[FinalCandidate],
        enrollable: &[SubjectId],
    ) -> SemesterPlan {
        let approve = finals
            .iter()
            .take(self.caps.max_finals.unwrap_or(usize::MAX))
            .map(|candidate| candidate.id.clone())
            .collect();
        let enroll = enrollable
            .iter()
            .take(self.caps.max_enrollments)
            .cloned()
            .collect();
        SemesterPlan { approve, enroll }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(prefix: &str, n: usize) -> Vec<SubjectId> {
        (0..n).map(|i| SubjectId::new(format!("{prefix}{i}"))).collect()
    }

    fn candidates(n: usize) -> Vec<FinalCandidate> {
        ids("f", n)
            .into_iter()
            .enumerate()
            .map(|(i, id)| FinalCandidate { id, impact: n - i })
            .collect()
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("finals-first".parse::<StrategyId>().unwrap(), StrategyId::FinalsFirst);
        assert_eq!("Courses_First".parse::<StrategyId>().unwrap(), StrategyId::CoursesFirst);
        assert_eq!("finals".parse::<StrategyId>().unwrap(), StrategyId::FinalsFirst);
        assert_eq!(" balanced ".parse::<StrategyId>().unwrap(), StrategyId::Balanced);
        let err = "cram".parse::<StrategyId>().unwrap_err();
        assert!(matches!(err, SimulationError::UnknownStrategy(name) if name == "cram"));
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&StrategyId::CoursesFirst).unwrap();
        assert_eq!(json, "\"courses-first\"");
        let parsed: StrategyId = serde_json::from_str("\"finals\"").unwrap();
        assert_eq!(parsed, StrategyId::FinalsFirst);
    }

    #[test]
    fn default_policies_respect_caps() {
        let config = SimulationConfig::default();
        let state = StatusMap::new();
        let finals = candidates(6);
        let enrollable = ids("c", 8);

        let plan = StrategyId::FinalsFirst
            .create_policy(&config)
            .plan(&state, &finals, &enrollable);
        assert_eq!(plan.approve.len(), 6);
        assert_eq!(plan.enroll.len(), 4);

        let plan = StrategyId::CoursesFirst
            .create_policy(&config)
            .plan(&state, &finals, &enrollable);
        assert_eq!(plan.approve, ids("f", 2));
        assert_eq!(plan.enroll.len(), 5);

        let policy = StrategyId::Balanced.create_policy(&config);
        assert_eq!(policy.name(), "balanced");
        let plan = policy.plan(&state, &finals, &enrollable);
        assert_eq!(plan.approve, ids("f", 3));
        assert_eq!(plan.enroll, ids("c", 3));
    }

    #[test]
    fn short_lists_are_taken_whole() {
        let config = SimulationConfig::default();
        let plan = StrategyId::Balanced.create_policy(&config).plan(
            &StatusMap::new(),
            &candidates(1),
            &[],
        );
        assert_eq!(plan.approve.len(), 1);
        assert!(plan.enroll.is_empty());
    }
}
