//! Per-study log of issued trials plus the dimensional aggregation of
//! completed regions that lets `find_least_division` answer "what's the
//! next free slice" without re-walking every point.

use crate::error::{InvalidSpaceError, ParameterError};
use crate::space::aligned::{AlignedSpace, AlignedSpaceModel};
use crate::space::flatten::{remap_space, simplify, FlattenSegment, MergeContext};
use crate::trial::{Mapping, Trial, TrialModel, TrialStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TrialTable {
    trials: Vec<Trial>,
    /// Keyed by lower-not-universal dim; `-1` is the fully-universal bucket.
    aggregated: HashMap<i64, Vec<AlignedSpace>>,
    /// Set from the first receipt's parameter space; `None` until then.
    dim: Option<usize>,
    pub timeout_minutes: i64,
}

impl TrialTable {
    pub fn new(timeout_minutes: i64) -> Self {
        Self {
            trials: Vec::new(),
            aggregated: HashMap::new(),
            dim: None,
            timeout_minutes,
        }
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn register(&mut self, mut trial: Trial) {
        trial.status = TrialStatus::Running;
        self.trials.push(trial);
    }

    /// `result = None` is an explicit no-op (the worker is only checking in).
    pub fn receipt(&mut self, trial_id: &str, result: Option<Vec<Mapping>>) -> Result<(), ParameterError> {
        let result = match result {
            Some(r) => r,
            None => return Ok(()),
        };
        let idx = self
            .trials
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| t.trial_id == trial_id)
            .map(|(i, _)| i)
            .ok_or_else(|| ParameterError::new("not found"))?;
        if self.trials[idx].status == TrialStatus::Done {
            return Err(ParameterError::new("override done"));
        }
        self.trials[idx].result = Some(result);
        self.trials[idx].status = TrialStatus::Done;

        let dim = self.trials[idx].parameter_space.dim();
        self.dim.get_or_insert(dim);
        let aligned_list = self.trials[idx]
            .parameter_space
            .to_aligned_list()
            .map_err(|e| ParameterError::new(e.0))?;
        self.aggregated
            .entry(dim as i64 - 1)
            .or_default()
            .extend(aligned_list);
        Ok(())
    }

    pub fn count_grid(&self) -> Option<i64> {
        let mut total: i64 = 0;
        for spaces in self.aggregated.values() {
            for space in spaces {
                total = total.checked_add(space.total()?)?;
            }
        }
        Some(total)
    }

    pub fn count_trial(&self) -> usize {
        self.trials.len()
    }

    /// True until the first receipt, i.e. no region has been aggregated yet.
    /// Distinct from `count_grid() == Some(0)`, which can't happen (an empty
    /// `aggregated` map still sums to 0, not `None`) but would otherwise be
    /// mistaken for "nothing aggregated" by a naive `is_none()` check.
    pub fn is_aggregation_empty(&self) -> bool {
        self.dim.is_none()
    }

    /// Merges adjacent siblings at each dim (deepest first), then re-buckets
    /// everything: a region lifted to full coverage at `d` may now belong
    /// shallower (or in the fully-universal `-1` bucket).
    pub fn simplify_aps(&mut self) {
        let dim = match self.dim {
            Some(d) => d,
            None => return,
        };
        let mut all: Vec<AlignedSpace> = Vec::new();
        for d in (0..dim).rev() {
            if let Some(items) = self.aggregated.remove(&(d as i64)) {
                if !items.is_empty() {
                    all.extend(simplify(&items, MergeContext::MultiDim { target_dim: d }));
                }
            }
        }
        if let Some(items) = self.aggregated.remove(&-1) {
            all.extend(items);
        }
        self.aggregated = remap_space(all, dim, |s| s.lower_not_universal_dim());
    }

    /// `None` total_num means the ambient space is axis-0-infinite.
    pub fn find_least_division(&mut self, total_num: Option<i64>) -> Result<FlattenSegment, InvalidSpaceError> {
        self.simplify_aps();
        let mut segments: Vec<FlattenSegment> = Vec::new();
        for spaces in self.aggregated.values() {
            for space in spaces {
                segments.push(space.flat_ambient_segment()?);
            }
        }
        if segments.is_empty() {
            return Ok(FlattenSegment::new(0, None));
        }
        let merged = simplify(&segments, MergeContext::OneDim);
        Ok(match merged.as_slice() {
            [] => FlattenSegment::new(0, None),
            [only] => {
                let next = only.next_start_index();
                if total_num.map_or(true, |t| next < t) {
                    FlattenSegment::new(next, None)
                } else {
                    FlattenSegment::new(next, Some(0))
                }
            }
            [first, second, ..] => {
                let next = first.next_start_index();
                FlattenSegment::new(next, Some(second.start - next))
            }
        })
    }

    pub fn to_model(&self) -> Result<TrialTableModel, crate::error::CodecError> {
        Ok(TrialTableModel {
            trials: self
                .trials
                .iter()
                .map(|t| t.to_model())
                .collect::<Result<Vec<_>, _>>()?,
            aggregated: self
                .aggregated
                .iter()
                .map(|(d, spaces)| (*d, spaces.iter().map(|s| s.to_model()).collect()))
                .collect(),
            dim: self.dim,
            timeout_minutes: self.timeout_minutes,
        })
    }

    pub fn from_model(model: TrialTableModel) -> Result<Self, ParameterError> {
        let trials = model
            .trials
            .into_iter()
            .map(Trial::from_model)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParameterError::new(e.to_string()))?;
        let aggregated = model
            .aggregated
            .into_iter()
            .map(|(d, spaces)| -> Result<(i64, Vec<AlignedSpace>), ParameterError> {
                Ok((d, spaces.iter().map(AlignedSpace::from_model).collect::<Result<Vec<_>, _>>()?))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(TrialTable {
            trials,
            aggregated,
            dim: model.dim,
            timeout_minutes: model.timeout_minutes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialTableModel {
    pub trials: Vec<TrialModel>,
    pub aggregated: HashMap<i64, Vec<AlignedSpaceModel>>,
    pub dim: Option<usize>,
    pub timeout_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Primitive, ValueType};
    use crate::space::segment::{Axis, IntAxis};
    use crate::space::ParameterSpace;
    use crate::trial::{ResultType, ResultValue, TrialStatus};
    use chrono::Utc;

    fn axis(ambient_index: i64, size: i64, ambient_size: i64) -> Axis {
        Axis::Int(IntAxis {
            name: Some("x".into()),
            start: ambient_index,
            step: 1,
            size: Some(size),
            ambient_index,
            ambient_size: Some(ambient_size),
        })
    }

    fn trial(trial_id: &str, start: i64, size: i64, ambient: i64) -> Trial {
        let space = ParameterSpace::Aligned(
            AlignedSpace::new(vec![axis(start, size, ambient)], true).unwrap(),
        );
        Trial {
            study_id: "s1".into(),
            trial_id: trial_id.into(),
            timestamp: Utc::now(),
            status: TrialStatus::Running,
            parameter_space: space,
            result_type: ResultType::Scalar,
            result_value_type: ValueType::Int,
            result: None,
        }
    }

    fn done_result(n: i64) -> Vec<Mapping> {
        (0..n)
            .map(|i| Mapping {
                params: vec![Primitive::Int(i)],
                result: ResultValue::Scalar(Primitive::Int(i)),
            })
            .collect()
    }

    #[test]
    fn exhaustive_1d_completes() {
        let mut table = TrialTable::new(60);
        table.register(trial("s1-0x0", 0, 3, 6));
        table.receipt("s1-0x0", Some(done_result(3))).unwrap();
        table.register(trial("s1-0x1", 3, 3, 6));
        table.receipt("s1-0x1", Some(done_result(3))).unwrap();
        assert_eq!(table.count_grid(), Some(6));
    }

    #[test]
    fn double_receipt_rejected() {
        let mut table = TrialTable::new(60);
        table.register(trial("s1-0x0", 0, 3, 6));
        table.receipt("s1-0x0", Some(done_result(3))).unwrap();
        let err = table.receipt("s1-0x0", Some(done_result(3))).unwrap_err();
        assert_eq!(err.0, "override done");
    }

    #[test]
    fn find_least_division_reports_gap() {
        let mut table = TrialTable::new(60);
        table.register(trial("s1-0x0", 0, 10, 100));
        table.receipt("s1-0x0", Some(done_result(10))).unwrap();
        table.register(trial("s1-0x1", 50, 10, 100));
        table.receipt("s1-0x1", Some(done_result(10))).unwrap();
        let seg = table.find_least_division(Some(100)).unwrap();
        assert_eq!(seg, FlattenSegment::new(10, Some(40)));
    }

    #[test]
    fn find_least_division_empty_table_is_open_ended() {
        let mut table = TrialTable::new(60);
        let seg = table.find_least_division(None).unwrap();
        assert_eq!(seg, FlattenSegment::new(0, None));
    }
}
