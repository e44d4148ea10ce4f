//! Carves the next trial's parameter (sub-)space out of whatever the
//! trial table reports as the next free flat slice.
//!
//! The tick-generation arithmetic (`generate_available_end_finite/infinite`)
//! mirrors the original's dimension-by-dimension boundary walk; the
//! infinite-axis extension is corrected to honor "largest tick with
//! `end - start <= capped`" exactly (the original's generator loop folds an
//! over-budget tick into the candidate set right before taking its max,
//! which can return an end past the budget — not reproduced here).
//!
//! Turning that flat `[start, end)` run into a per-axis slice
//! (`carve_start_and_sizes`) needs more than a per-dimension subtraction of
//! the two looms once more than one axis is in play; see its doc comment.

use crate::codec::Primitive;
use crate::error::{CoreError, ParameterError};
use crate::space::aligned::{loom_by_flat_index, AlignedSpace};
use crate::space::jagged::JaggedSpace;
use crate::space::segment::{Axis, DummyAxis, StepValue};
use crate::space::ParameterSpace;
use crate::trial_table::TrialTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialSuggest {
    pub strict_aligned: bool,
}

impl SequentialSuggest {
    pub fn new(strict_aligned: bool) -> Self {
        Self { strict_aligned }
    }

    pub fn to_model(&self) -> SuggestStrategyModel {
        SuggestStrategyModel::Sequential { strict_aligned: self.strict_aligned }
    }

    pub fn from_model(model: &SuggestStrategyModel) -> Result<Self, crate::error::TypeError> {
        match model {
            SuggestStrategyModel::Sequential { strict_aligned } => Ok(SequentialSuggest::new(*strict_aligned)),
            SuggestStrategyModel::Random => {
                Err(crate::error::TypeError::new("random", "unknown suggest strategy"))
            }
            SuggestStrategyModel::Designated => {
                Err(crate::error::TypeError::new("designated", "unknown suggest strategy"))
            }
        }
    }

    /// `None` means no work remains under the current budget.
    pub fn suggest(
        &self,
        parameter_space: &AlignedSpace,
        table: &mut TrialTable,
        max_num: i64,
    ) -> Result<Option<ParameterSpace>, CoreError> {
        let seg = table.find_least_division(parameter_space.total())?;
        let capped = nullable_min(seg.size, Some(max_num))?;
        if capped <= 0 {
            return Ok(None);
        }
        let start = seg.start;
        let strides = parameter_space.lower_element_num_by_dim();

        if self.strict_aligned {
            let max_available_end = if parameter_space.total().is_none() {
                let (available_end, infinite_flag) = generate_available_end_infinite(parameter_space, start);
                let candidates = if infinite_flag {
                    extend_until_over_budget(available_end, strides[0], start, capped)
                } else {
                    available_end
                };
                candidates.into_iter().filter(|&e| e - start <= capped).max()
            } else {
                let available_end = generate_available_end_finite(parameter_space, start);
                available_end.into_iter().filter(|&e| e - start <= capped).max()
            };
            let max_available_end = max_available_end
                .ok_or_else(|| ParameterError::new("no available tick within budget"))?;

            let start_loom = loom_by_flat_index(start, &strides);
            let end_loom = loom_by_flat_index(max_available_end, &strides);
            let start_and_sizes = carve_start_and_sizes(&start_loom, &end_loom, &parameter_space.dimensional_sizes());
            let sliced = parameter_space.slice(&start_and_sizes)?;
            Ok(Some(ParameterSpace::Aligned(sliced)))
        } else {
            let points: Vec<Vec<Primitive>> = parameter_space
                .grid()
                .skip(start as usize)
                .take(capped as usize)
                .collect();
            if points.is_empty() {
                return Ok(None);
            }
            let ambient_indices: Vec<Vec<i64>> = (0..points.len() as i64)
                .map(|i| loom_by_flat_index(start + i, &strides))
                .collect();
            let axes_info: Vec<DummyAxis> = parameter_space.axes().iter().map(to_dummy).collect();
            let jagged = JaggedSpace::new(points, ambient_indices, axes_info)?;
            Ok(Some(ParameterSpace::Jagged(jagged)))
        }
    }
}

/// Wire form. `Random`/`Designated` round-trip the discriminator but are
/// rejected by `from_model`: the core only implements sequential suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestStrategyModel {
    Sequential { strict_aligned: bool },
    Random,
    Designated,
}

fn to_dummy(axis: &Axis) -> DummyAxis {
    let step = match axis {
        Axis::Bool(_) => StepValue::Int(1),
        Axis::Int(a) => StepValue::Int(a.step),
        Axis::Float(a) => StepValue::Float(a.step),
        Axis::Dummy(d) => d.step,
    };
    DummyAxis {
        name: axis.name().unwrap_or_default().to_string(),
        value_type: axis.value_type(),
        step,
        ambient_size: axis.ambient_size(),
    }
}

fn nullable_min(a: Option<i64>, b: Option<i64>) -> Result<i64, ParameterError> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(a.min(b)),
        (Some(a), None) => Ok(a),
        (None, Some(b)) => Ok(b),
        (None, None) => Err(ParameterError::new("nullable_min: both arguments are None")),
    }
}

/// Dimension-by-dimension boundary walk for a fully finite space: starting
/// one past `flatten_index`, tile out to the end of the deepest dim whose
/// stride evenly divides `flatten_index`, then the next dim out, and so on.
fn generate_available_end_finite(space: &AlignedSpace, flatten_index: i64) -> Vec<i64> {
    let dims = space.dim();
    let dim_sizes: Vec<i64> = space
        .dimensional_sizes()
        .iter()
        .map(|s| s.expect("generate_available_end_finite requires a fully finite space"))
        .collect();
    let reversed_dim_sizes: Vec<i64> = dim_sizes.iter().rev().copied().collect();
    let lower_dims = space.lower_element_num_by_dim();
    let reversed_loomed: Vec<i64> = loom_by_flat_index(flatten_index, &lower_dims)
        .into_iter()
        .rev()
        .collect();

    let available_max_upper_reverse_dim = highest_aligned_reverse_dim(flatten_index, &lower_dims, dims);

    let mut ticks = vec![flatten_index + 1];
    for reverse_dim in 0..=available_max_upper_reverse_dim {
        let lower_dim = lower_dims[dims - 1 - reverse_dim];
        let size = reversed_dim_sizes[reverse_dim] - reversed_loomed[reverse_dim];
        if size <= 1 {
            continue;
        }
        let d_init = *ticks.last().unwrap();
        for x in 1..size {
            ticks.push(d_init + lower_dim * x);
        }
    }
    ticks
}

/// As above, but for a space whose axis 0 is unbounded: stops tiling the
/// moment it would need axis 0's size, and reports whether the walk ran
/// off the edge of every finite dim (meaning the caller must keep
/// extending by axis 0's stride to cover the requested budget).
fn generate_available_end_infinite(space: &AlignedSpace, flatten_index: i64) -> (Vec<i64>, bool) {
    let dims = space.dim();
    let reversed_dim_sizes: Vec<Option<i64>> = space.dimensional_sizes().into_iter().rev().collect();
    let lower_dims = space.lower_element_num_by_dim();
    let reversed_loomed: Vec<i64> = loom_by_flat_index(flatten_index, &lower_dims)
        .into_iter()
        .rev()
        .collect();

    let available_max_upper_reverse_dim = highest_aligned_reverse_dim(flatten_index, &lower_dims, dims);

    let mut ticks = vec![flatten_index + 1];
    for reverse_dim in 0..=available_max_upper_reverse_dim {
        let lower_dim = lower_dims[dims - 1 - reverse_dim];
        let size = match reversed_dim_sizes[reverse_dim] {
            None => break,
            Some(s) => s - reversed_loomed[reverse_dim],
        };
        if size <= 1 {
            continue;
        }
        let d_init = *ticks.last().unwrap();
        for x in 1..size {
            ticks.push(d_init + lower_dim * x);
        }
    }
    let is_infinitely_available = ticks.last().unwrap() - flatten_index == lower_dims[0];
    (ticks, is_infinitely_available)
}

/// Turns the flat `[start, end)` run into a per-axis `(local_start, size)`
/// list that `AlignedSpace::slice` can carve directly.
///
/// Naive per-dimension subtraction (`end_loom[i] - start_loom[i]`) is only
/// correct at the one dim where the two looms first diverge; every shallower
/// dim is pinned to a single index (size 1), and every deeper dim has wound
/// all the way around back to 0 in `end_loom` — its slice is the dim's full
/// size, not the (wrongly zero) naive difference. `start`'s own deeper digits
/// are already 0 here, since `generate_available_end_*` only ever extends
/// from a dim whose stride evenly divides `start`.
fn carve_start_and_sizes(start_loom: &[i64], end_loom: &[i64], dim_sizes: &[Option<i64>]) -> Vec<(i64, i64)> {
    let k = start_loom
        .iter()
        .zip(end_loom)
        .position(|(s, e)| s != e)
        .unwrap_or(start_loom.len().saturating_sub(1));
    start_loom
        .iter()
        .enumerate()
        .map(|(i, &s)| match i.cmp(&k) {
            std::cmp::Ordering::Less => (s, 1),
            std::cmp::Ordering::Equal => (s, end_loom[i] - s),
            std::cmp::Ordering::Greater => (
                0,
                dim_sizes[i].expect("dims deeper than the first divergence are always finite"),
            ),
        })
        .collect()
}

fn highest_aligned_reverse_dim(flatten_index: i64, lower_dims: &[i64], dims: usize) -> usize {
    for (dim, &lower_dim) in lower_dims.iter().enumerate() {
        if flatten_index % lower_dim == 0 {
            return dims - dim - 1;
        }
    }
    0
}

fn extend_until_over_budget(mut ticks: Vec<i64>, ratio: i64, start: i64, capped: i64) -> Vec<i64> {
    loop {
        let last = *ticks.last().unwrap();
        if last - start > capped {
            break;
        }
        ticks.push(last + ratio);
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::segment::IntAxis;

    fn axis(size: i64, ambient_size: i64) -> Axis {
        Axis::Int(IntAxis {
            name: Some("x".into()),
            start: 0,
            step: 1,
            size: Some(size),
            ambient_index: 0,
            ambient_size: Some(ambient_size),
        })
    }

    #[test]
    fn exhaustive_1d_reserves_budget_sized_slabs() {
        let space = AlignedSpace::new(vec![axis(6, 6)], true).unwrap();
        let mut table = TrialTable::new(60);
        let strategy = SequentialSuggest::new(true);

        let first = strategy.suggest(&space, &mut table, 3).unwrap().unwrap();
        let aligned = first.as_aligned().unwrap();
        assert_eq!(aligned.get_start_index(0), 0);
        assert_eq!(aligned.dimensional_sizes(), vec![Some(3)]);
    }

    #[test]
    fn two_dim_aligned_tiles_full_rows() {
        let space = AlignedSpace::new(vec![axis(2, 2), axis(2, 2)], true).unwrap();
        let mut table = TrialTable::new(60);
        let strategy = SequentialSuggest::new(true);

        let first = strategy.suggest(&space, &mut table, 2).unwrap().unwrap();
        let aligned = first.as_aligned().unwrap();
        assert_eq!(aligned.get_start_index(0), 0);
        assert_eq!(aligned.dimensional_sizes(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn jagged_fallback_enumerates_points() {
        let space = AlignedSpace::new(vec![axis(4, 4)], true).unwrap();
        let mut table = TrialTable::new(60);
        let strategy = SequentialSuggest::new(false);

        let proposed = strategy.suggest(&space, &mut table, 2).unwrap().unwrap();
        match proposed {
            ParameterSpace::Jagged(j) => assert_eq!(j.len(), 2),
            ParameterSpace::Aligned(_) => panic!("expected jagged fallback"),
        }
    }

    #[test]
    fn infinite_axis_extends_past_initial_ticks() {
        let space = AlignedSpace::new(
            vec![Axis::Int(IntAxis {
                name: Some("x".into()),
                start: 0,
                step: 1,
                size: None,
                ambient_index: 0,
                ambient_size: None,
            })],
            true,
        )
        .unwrap();
        let mut table = TrialTable::new(60);
        let strategy = SequentialSuggest::new(true);

        let first = strategy.suggest(&space, &mut table, 10).unwrap().unwrap();
        let aligned = first.as_aligned().unwrap();
        assert_eq!(aligned.get_start_index(0), 0);
        assert_eq!(aligned.dimensional_sizes(), vec![Some(10)]);
    }
}
