//! A unit of work: a parameter grid, its completion rule, and the mutex
//! guarding the trial table it accumulates into. Mirrors
//! `curriculum_models/study.py`'s `Study`, trading its `threading.Lock`
//! for `tokio::sync::Mutex` per the ambient concurrency stack.

use crate::codec::ValueType;
use crate::common::publish_timestamp;
use crate::error::{CodecError, CoreError, ParameterError, TypeError};
use crate::space::aligned::{AlignedSpace, AlignedSpaceModel};
use crate::strategy::{StudyStrategy, StudyStrategyModel};
use crate::suggest::{SequentialSuggest, SuggestStrategyModel};
use crate::trial::{Mapping, ResultType, Trial, TrialModel};
use crate::trial_table::{TrialTable, TrialTableModel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStatus {
    Wait,
    Running,
    Done,
}

pub struct Study {
    pub study_id: String,
    pub name: String,
    pub required_capacity: Vec<String>,
    pub status: std::sync::atomic::AtomicU8,
    pub registered_timestamp: DateTime<Utc>,
    pub study_strategy: StudyStrategy,
    pub suggest_strategy: SequentialSuggest,
    pub parameter_space: AlignedSpace,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    table: tokio::sync::Mutex<TrialTable>,
}

const STATUS_WAIT: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_DONE: u8 = 2;

impl Study {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        study_id: String,
        name: Option<String>,
        required_capacity: Vec<String>,
        registered_timestamp: DateTime<Utc>,
        study_strategy: StudyStrategy,
        suggest_strategy: SequentialSuggest,
        parameter_space: AlignedSpace,
        result_type: ResultType,
        result_value_type: ValueType,
        trial_table: TrialTable,
    ) -> Self {
        let name = name.unwrap_or_else(|| study_id.clone());
        Self {
            study_id,
            name,
            required_capacity,
            status: std::sync::atomic::AtomicU8::new(STATUS_WAIT),
            registered_timestamp,
            study_strategy,
            suggest_strategy,
            parameter_space,
            result_type,
            result_value_type,
            table: tokio::sync::Mutex::new(trial_table),
        }
    }

    pub fn status(&self) -> StudyStatus {
        match self.status.load(std::sync::atomic::Ordering::Acquire) {
            STATUS_WAIT => StudyStatus::Wait,
            STATUS_RUNNING => StudyStatus::Running,
            _ => StudyStatus::Done,
        }
    }

    fn set_status(&self, status: StudyStatus) {
        let raw = match status {
            StudyStatus::Wait => STATUS_WAIT,
            StudyStatus::Running => STATUS_RUNNING,
            StudyStatus::Done => STATUS_DONE,
        };
        self.status.store(raw, std::sync::atomic::Ordering::Release);
    }

    /// Acquires the table mutex, proposes the next trial, registers it, and
    /// returns it. `None` means the suggest strategy found no remaining work.
    pub async fn suggest_next_trial(&self, max_num: i64) -> Result<Option<Trial>, CoreError> {
        let mut table = self.table.lock().await;
        let proposed = self
            .suggest_strategy
            .suggest(&self.parameter_space, &mut table, max_num)?;
        let Some(parameter_space) = proposed else {
            return Ok(None);
        };
        let trial = Trial {
            study_id: self.study_id.clone(),
            trial_id: format!("{}-{}", self.study_id, crate::codec::encode_int(table.count_trial() as i64)),
            timestamp: publish_timestamp(),
            status: crate::trial::TrialStatus::Running,
            parameter_space,
            result_type: self.result_type,
            result_value_type: self.result_value_type,
            result: None,
        };
        table.register(trial.clone());
        Ok(Some(trial))
    }

    /// Under the table mutex, records the trial's result.
    pub async fn receipt_trial(&self, trial_id: &str, result: Option<Vec<Mapping>>) -> Result<(), ParameterError> {
        let mut table = self.table.lock().await;
        table.receipt(trial_id, result)
    }

    /// `Wait` if the table has no aggregation yet, `Done` if the strategy
    /// says so, else `Running`. Updates and returns the new status.
    pub async fn update_status(&self) -> StudyStatus {
        let mut table = self.table.lock().await;
        let status = if table.is_aggregation_empty() && table.trials().is_empty() {
            StudyStatus::Wait
        } else if self.study_strategy.is_done(&table, self.parameter_space.total()) {
            StudyStatus::Done
        } else {
            StudyStatus::Running
        };
        drop(table);
        self.set_status(status);
        status
    }

    pub async fn is_done(&self) -> bool {
        let table = self.table.lock().await;
        self.study_strategy.is_done(&table, self.parameter_space.total())
    }

    pub async fn to_storage(&self) -> Result<StudyStorage, CodecError> {
        let table = self.table.lock().await;
        Ok(StudyStorage {
            study_id: self.study_id.clone(),
            name: self.name.clone(),
            registered_timestamp: self.registered_timestamp,
            done_timestamp: publish_timestamp(),
            result_type: self.result_type,
            result_value_type: self.result_value_type,
            result: self.study_strategy.extract_mappings(&table),
        })
    }

    pub async fn to_model(&self) -> Result<StudyModel, CodecError> {
        let table = self.table.lock().await;
        Ok(StudyModel {
            study_id: self.study_id.clone(),
            name: Some(self.name.clone()),
            required_capacity: self.required_capacity.clone(),
            status: self.status(),
            registered_timestamp: self.registered_timestamp,
            study_strategy: self.study_strategy.to_model()?,
            suggest_strategy: self.suggest_strategy.to_model(),
            parameter_space: self.parameter_space.to_model(),
            result_type: self.result_type,
            result_value_type: self.result_value_type,
            trial_table: table.to_model()?,
        })
    }

    pub fn from_model(model: StudyModel) -> Result<Self, TypeError> {
        let study_strategy = StudyStrategy::from_model(&model.study_strategy)?;
        let suggest_strategy = SequentialSuggest::from_model(&model.suggest_strategy)?;
        let parameter_space = AlignedSpace::from_model(&model.parameter_space)
            .map_err(|_| TypeError::new("parameter_space", "malformed aligned space"))?;
        let trial_table = TrialTable::from_model(model.trial_table)
            .map_err(|_| TypeError::new("trial_table", "malformed trial table"))?;
        let study = Study::new(
            model.study_id,
            model.name,
            model.required_capacity,
            model.registered_timestamp,
            study_strategy,
            suggest_strategy,
            parameter_space,
            model.result_type,
            model.result_value_type,
            trial_table,
        );
        study.set_status(model.status);
        Ok(study)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyStorage {
    pub study_id: String,
    pub name: String,
    pub registered_timestamp: DateTime<Utc>,
    pub done_timestamp: DateTime<Utc>,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    pub result: Vec<Mapping>,
}

impl StudyStorage {
    pub fn to_model(&self) -> Result<StudyStorageModel, CodecError> {
        Ok(StudyStorageModel {
            study_id: self.study_id.clone(),
            name: self.name.clone(),
            registered_timestamp: self.registered_timestamp,
            done_timestamp: self.done_timestamp,
            result_type: self.result_type,
            result_value_type: self.result_value_type,
            result: self
                .result
                .iter()
                .map(|m| crate::trial::mapping_to_model(m, self.result_value_type))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    pub fn from_model(model: StudyStorageModel) -> Result<Self, CodecError> {
        Ok(StudyStorage {
            study_id: model.study_id,
            name: model.name,
            registered_timestamp: model.registered_timestamp,
            done_timestamp: model.done_timestamp,
            result_type: model.result_type,
            result_value_type: model.result_value_type,
            result: model
                .result
                .into_iter()
                .map(|m| crate::trial::mapping_from_model(m, model.result_value_type))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyStorageModel {
    pub study_id: String,
    pub name: String,
    pub registered_timestamp: DateTime<Utc>,
    pub done_timestamp: DateTime<Utc>,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    pub result: Vec<crate::trial::MappingModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyModel {
    pub study_id: String,
    pub name: Option<String>,
    pub required_capacity: Vec<String>,
    pub status: StudyStatus,
    pub registered_timestamp: DateTime<Utc>,
    pub study_strategy: StudyStrategyModel,
    pub suggest_strategy: SuggestStrategyModel,
    pub parameter_space: AlignedSpaceModel,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    pub trial_table: TrialTableModel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::segment::{Axis, IntAxis};

    fn axis(size: i64) -> Axis {
        Axis::Int(IntAxis {
            name: Some("x".into()),
            start: 0,
            step: 1,
            size: Some(size),
            ambient_index: 0,
            ambient_size: Some(size),
        })
    }

    fn study() -> Study {
        Study::new(
            "s1".into(),
            None,
            vec![],
            Utc::now(),
            StudyStrategy::AllCalculation,
            SequentialSuggest::new(true),
            AlignedSpace::new(vec![axis(6)], true).unwrap(),
            ResultType::Scalar,
            ValueType::Int,
            TrialTable::new(60),
        )
    }

    #[tokio::test]
    async fn exhaustive_1d_reaches_done_across_two_reserves() {
        let study = study();
        assert_eq!(study.update_status().await, StudyStatus::Wait);

        let t1 = study.suggest_next_trial(3).await.unwrap().unwrap();
        assert_eq!(t1.trial_id, "s1-0x0");
        study
            .receipt_trial(
                &t1.trial_id,
                Some(
                    (0..3)
                        .map(|i| Mapping {
                            params: vec![crate::codec::Primitive::Int(i)],
                            result: crate::trial::ResultValue::Scalar(crate::codec::Primitive::Int(i)),
                        })
                        .collect(),
                ),
            )
            .await
            .unwrap();
        assert_eq!(study.update_status().await, StudyStatus::Running);

        let t2 = study.suggest_next_trial(3).await.unwrap().unwrap();
        assert_eq!(t2.trial_id, "s1-0x1");
        study
            .receipt_trial(
                &t2.trial_id,
                Some(
                    (3..6)
                        .map(|i| Mapping {
                            params: vec![crate::codec::Primitive::Int(i)],
                            result: crate::trial::ResultValue::Scalar(crate::codec::Primitive::Int(i)),
                        })
                        .collect(),
                ),
            )
            .await
            .unwrap();
        assert_eq!(study.update_status().await, StudyStatus::Done);

        let storage = study.to_storage().await.unwrap();
        assert_eq!(storage.result.len(), 6);
    }
}
