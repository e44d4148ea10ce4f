//! Completion predicates and result extraction for a study: exhaustive
//! coverage vs. stop-on-first-match. Re-architected from the original's
//! `BaseStudyStrategy` subclass pair into one tagged enum, per the same
//! capability-interface call as [`crate::space::segment::Axis`].

use crate::codec::Primitive;
use crate::error::TypeError;
use crate::trial::{Mapping, ResultValue};
use crate::trial_table::TrialTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum StudyStrategy {
    AllCalculation,
    FindExact(Primitive),
}

impl StudyStrategy {
    pub fn can_merge(&self) -> bool {
        match self {
            StudyStrategy::AllCalculation => true,
            StudyStrategy::FindExact(_) => false,
        }
    }

    pub fn is_done(&self, table: &TrialTable, total: Option<i64>) -> bool {
        match self {
            StudyStrategy::AllCalculation => table.count_grid() == total,
            StudyStrategy::FindExact(target) => table.trials().iter().any(|t| {
                t.result.as_ref().is_some_and(|mappings| {
                    mappings.iter().any(|m| result_matches(&m.result, target))
                })
            }),
        }
    }

    /// Mappings to keep in the study's final storage.
    pub fn extract_mappings(&self, table: &TrialTable) -> Vec<Mapping> {
        match self {
            StudyStrategy::AllCalculation => table
                .trials()
                .iter()
                .filter_map(|t| t.result.as_ref())
                .flat_map(|r| r.iter().cloned())
                .collect(),
            StudyStrategy::FindExact(target) => table
                .trials()
                .iter()
                .filter_map(|t| t.result.as_ref())
                .flat_map(|r| r.iter().cloned())
                .filter(|m| result_matches(&m.result, target))
                .collect(),
        }
    }

    pub fn to_model(&self) -> Result<StudyStrategyModel, crate::error::CodecError> {
        Ok(match self {
            StudyStrategy::AllCalculation => StudyStrategyModel::AllCalculation,
            StudyStrategy::FindExact(target) => StudyStrategyModel::FindExact {
                target_value: crate::codec::encode(target, target.value_type())?,
                value_type: target.value_type(),
            },
        })
    }

    pub fn from_model(model: &StudyStrategyModel) -> Result<Self, TypeError> {
        match model {
            StudyStrategyModel::AllCalculation => Ok(StudyStrategy::AllCalculation),
            StudyStrategyModel::FindExact { target_value, value_type } => {
                let target = crate::codec::decode(target_value, *value_type)
                    .map_err(|_| TypeError::new("find_exact", "malformed target_value"))?;
                Ok(StudyStrategy::FindExact(target))
            }
            StudyStrategyModel::Minimize => Err(TypeError::new("minimize", "unknown study strategy")),
        }
    }
}

fn result_matches(result: &ResultValue, target: &Primitive) -> bool {
    match result {
        ResultValue::Scalar(v) => v.bit_exact_eq(target),
        ResultValue::Vector(_) => false,
    }
}

/// Wire form. `Minimize` is declared so the discriminator round-trips, but
/// `from_model` rejects it: the core does not implement it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudyStrategyModel {
    AllCalculation,
    FindExact {
        target_value: String,
        value_type: crate::codec::ValueType,
    },
    Minimize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueType;
    use crate::space::aligned::AlignedSpace;
    use crate::space::segment::{Axis, IntAxis};
    use crate::space::ParameterSpace;
    use crate::trial::{ResultType, Trial, TrialStatus};
    use chrono::Utc;

    fn done_trial(result: Vec<Mapping>) -> Trial {
        Trial {
            study_id: "s1".into(),
            trial_id: "s1-0x0".into(),
            timestamp: Utc::now(),
            status: TrialStatus::Done,
            parameter_space: ParameterSpace::Aligned(
                AlignedSpace::new(
                    vec![Axis::Int(IntAxis {
                        name: None,
                        start: 0,
                        step: 1,
                        size: Some(1),
                        ambient_index: 0,
                        ambient_size: Some(1),
                    })],
                    true,
                )
                .unwrap(),
            ),
            result_type: ResultType::Scalar,
            result_value_type: ValueType::Int,
            result: Some(result),
        }
    }

    #[test]
    fn minimize_is_rejected_at_construction() {
        let err = StudyStrategy::from_model(&StudyStrategyModel::Minimize).unwrap_err();
        assert_eq!(err.kind, "minimize");
    }

    #[test]
    fn find_exact_matches_bit_exactly() {
        let strategy = StudyStrategy::FindExact(Primitive::Int(42));
        let mut table = TrialTable::new(60);
        table.register(done_trial(vec![Mapping {
            params: vec![Primitive::Int(0)],
            result: ResultValue::Scalar(Primitive::Int(41)),
        }]));
        assert!(!strategy.is_done(&table, Some(10)));

        table.register(done_trial(vec![Mapping {
            params: vec![Primitive::Int(1)],
            result: ResultValue::Scalar(Primitive::Int(42)),
        }]));
        assert!(strategy.is_done(&table, Some(10)));
        assert_eq!(strategy.extract_mappings(&table).len(), 1);
    }
}
