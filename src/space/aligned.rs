//! Ordered list of line segments forming an axis-aligned N-D box: the
//! grid a study's function is evaluated over, or a completed/in-flight
//! sub-region of one.

use super::flatten::{FlattenSegment, MergeContext, Mergeable};
use super::segment::{Axis, AxisModel};
use crate::codec::Primitive;
use crate::error::{InvalidSpaceError, ParameterError};
use serde::{Deserialize, Serialize};

/// Axis-aligned sub-box of a parameter space. `axes[0]` is outermost /
/// slowest-varying. `check_lower_filling` forces the structural invariant
/// (see module docs) that guarantees the region is a single contiguous run
/// in row-major flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSpace {
    axes: Vec<Axis>,
    check_lower_filling: bool,
}

impl AlignedSpace {
    pub fn new(axes: Vec<Axis>, check_lower_filling: bool) -> Result<Self, InvalidSpaceError> {
        for (i, axis) in axes.iter().enumerate().skip(1) {
            if axis.ambient_size().is_none() {
                return Err(InvalidSpaceError::new(format!(
                    "axis {i} has infinite ambient_size; only axis 0 may be infinite"
                )));
            }
        }
        if check_lower_filling {
            validate_lower_filling(&axes)?;
        }
        Ok(Self {
            axes,
            check_lower_filling,
        })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    pub fn dimensional_sizes(&self) -> Vec<Option<i64>> {
        self.axes.iter().map(|a| a.size()).collect()
    }

    pub fn total(&self) -> Option<i64> {
        let mut acc: i64 = 1;
        for axis in &self.axes {
            acc = acc.checked_mul(axis.size()?)?;
        }
        Some(acc)
    }

    /// `lower_element_num_by_dim[i] = Π_{j>i} ambient_size_j`, with `1` at
    /// the innermost axis. Always finite: only axis 0 may be infinite, and
    /// axis 0 never appears as the multiplicand for any stride.
    pub fn lower_element_num_by_dim(&self) -> Vec<i64> {
        let d = self.axes.len();
        let mut strides = vec![1i64; d];
        for i in (0..d.saturating_sub(1)).rev() {
            let ambient = self.axes[i + 1]
                .ambient_size()
                .expect("non-axis-0 ambient_size is always finite");
            strides[i] = strides[i + 1] * ambient;
        }
        strides
    }

    pub fn filling(&self) -> Vec<bool> {
        self.axes.iter().map(|a| a.is_universal()).collect()
    }

    /// Largest axis index not fully covering its ambient axis; `-1` if the
    /// whole space is universal (fully covered).
    pub fn lower_not_universal_dim(&self) -> i64 {
        lower_not_universal_dim(&self.axes)
    }

    pub fn get_start_index(&self, target_dim: usize) -> i64 {
        self.axes[target_dim].ambient_index()
    }

    /// Row-major index of this region's first point in the ambient grid.
    /// Requires `check_lower_filling`, since only then is the region
    /// guaranteed to be a single flat interval.
    pub fn flat_ambient_segment(&self) -> Result<FlattenSegment, InvalidSpaceError> {
        if !self.check_lower_filling {
            return Err(InvalidSpaceError::new(
                "flat_ambient_segment requires check_lower_filling",
            ));
        }
        let strides = self.lower_element_num_by_dim();
        let start: i64 = self
            .axes
            .iter()
            .zip(&strides)
            .map(|(a, s)| a.ambient_index() * s)
            .sum();
        Ok(FlattenSegment::new(start, self.total()))
    }

    pub fn slice(&self, start_and_sizes: &[(i64, i64)]) -> Result<AlignedSpace, ParameterError> {
        if start_and_sizes.len() != self.axes.len() {
            return Err(ParameterError::new(format!(
                "slice arity {} does not match space dim {}",
                start_and_sizes.len(),
                self.axes.len()
            )));
        }
        let axes = self
            .axes
            .iter()
            .zip(start_and_sizes)
            .map(|(axis, &(start, size))| axis.slice(start, size))
            .collect::<Result<Vec<_>, _>>()?;
        AlignedSpace::new(axes, self.check_lower_filling)
            .map_err(|e| ParameterError::new(e.0))
    }

    pub fn can_merge(&self, other: &AlignedSpace, target_dim: usize) -> bool {
        if self.axes.len() != other.axes.len() || target_dim >= self.axes.len() {
            return false;
        }
        let same_ambient = self
            .axes
            .iter()
            .zip(&other.axes)
            .all(|(a, b)| a.derived_from_same_ambient(b));
        if !same_ambient {
            return false;
        }
        if self.filling() != other.filling() {
            return false;
        }
        if self.filling()[target_dim] {
            return false;
        }
        let deeper_universal = self.axes[(target_dim + 1)..]
            .iter()
            .chain(&other.axes[(target_dim + 1)..])
            .all(|a| a.is_universal());
        if !deeper_universal {
            return false;
        }
        let shallow_equal = self.axes[..target_dim]
            .iter()
            .zip(&other.axes[..target_dim])
            .all(|(a, b)| a == b);
        if !shallow_equal {
            return false;
        }
        self.axes[target_dim].can_merge(&other.axes[target_dim])
    }

    pub fn merge(&self, other: &AlignedSpace, target_dim: usize) -> Result<AlignedSpace, InvalidSpaceError> {
        let mut axes = self.axes.clone();
        axes[target_dim] = self.axes[target_dim].merge(&other.axes[target_dim])?;
        AlignedSpace::new(axes, self.check_lower_filling)
    }

    /// Row-major Cartesian product. Lazy and possibly infinite if axis 0 is.
    pub fn grid(&self) -> Box<dyn Iterator<Item = Vec<Primitive>> + '_> {
        if self.axes.is_empty() {
            return Box::new(std::iter::once(Vec::new()));
        }
        let inner: Vec<Vec<Primitive>> = self.axes[1..].iter().map(|a| a.grid().collect()).collect();
        let outer = self.axes[0].grid();
        Box::new(outer.flat_map(move |ov| {
            cartesian(&inner).into_iter().map(move |mut tail| {
                tail.insert(0, ov.clone());
                tail
            })
        }))
    }

    pub fn to_model(&self) -> AlignedSpaceModel {
        AlignedSpaceModel {
            axes: self.axes.iter().map(|a| a.to_model()).collect(),
            check_lower_filling: self.check_lower_filling,
        }
    }

    pub fn from_model(model: &AlignedSpaceModel) -> Result<Self, ParameterError> {
        let axes = model
            .axes
            .iter()
            .map(Axis::from_model)
            .collect::<Result<Vec<_>, _>>()?;
        AlignedSpace::new(axes, model.check_lower_filling).map_err(|e| ParameterError::new(e.0))
    }
}

impl Mergeable for AlignedSpace {
    fn start_index(&self, ctx: MergeContext) -> i64 {
        self.get_start_index(ctx.target_dim())
    }

    fn can_merge(&self, other: &Self, ctx: MergeContext) -> bool {
        AlignedSpace::can_merge(self, other, ctx.target_dim())
    }

    fn merge(&self, other: &Self, ctx: MergeContext) -> Self {
        AlignedSpace::merge(self, other, ctx.target_dim())
            .expect("merge called on a can_merge-verified pair")
    }
}

/// `loom`: quotient/remainder walk from a flat row-major index to a
/// multi-index, given each dimension's stride.
pub fn loom_by_flat_index(flat_index: i64, strides: &[i64]) -> Vec<i64> {
    let mut remaining = flat_index;
    let mut index = Vec::with_capacity(strides.len());
    for &stride in strides {
        index.push(remaining / stride);
        remaining %= stride;
    }
    index
}

fn lower_not_universal_dim(axes: &[Axis]) -> i64 {
    for i in (0..axes.len()).rev() {
        if !axes[i].is_universal() {
            return i as i64;
        }
    }
    -1
}

fn validate_lower_filling(axes: &[Axis]) -> Result<(), InvalidSpaceError> {
    let d = lower_not_universal_dim(axes);
    if d <= 0 {
        return Ok(());
    }
    for (i, axis) in axes.iter().enumerate().take(d as usize) {
        if axis.size() != Some(1) {
            return Err(InvalidSpaceError::new(format!(
                "axis {i} must have size 1 under the lower-filling invariant (lower-not-universal dim is {d})"
            )));
        }
    }
    Ok(())
}

fn cartesian(axes_grids: &[Vec<Primitive>]) -> Vec<Vec<Primitive>> {
    axes_grids.iter().fold(vec![Vec::new()], |acc, grid| {
        let mut next = Vec::with_capacity(acc.len() * grid.len().max(1));
        for combo in &acc {
            for v in grid {
                let mut c = combo.clone();
                c.push(*v);
                next.push(c);
            }
        }
        next
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedSpaceModel {
    pub axes: Vec<AxisModel>,
    #[serde(default = "default_true")]
    pub check_lower_filling: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::segment::IntAxis;

    fn axis(ambient_index: i64, size: i64, ambient_size: i64) -> Axis {
        Axis::Int(IntAxis {
            name: None,
            start: ambient_index,
            step: 1,
            size: Some(size),
            ambient_index,
            ambient_size: Some(ambient_size),
        })
    }

    #[test]
    fn two_dim_completion_collapses_aggregation() {
        let x0 = AlignedSpace::new(
            vec![axis(0, 1, 2), Axis::Int(IntAxis { name: None, start: 0, step: 1, size: Some(2), ambient_index: 0, ambient_size: Some(2) })],
            true,
        )
        .unwrap();
        let x1 = AlignedSpace::new(
            vec![axis(1, 1, 2), Axis::Int(IntAxis { name: None, start: 0, step: 1, size: Some(2), ambient_index: 0, ambient_size: Some(2) })],
            true,
        )
        .unwrap();
        assert!(x0.can_merge(&x1, 0));
        let merged = x0.merge(&x1, 0).unwrap();
        assert_eq!(merged.total(), Some(4));
        assert_eq!(merged.lower_not_universal_dim(), -1);
    }

    #[test]
    fn flat_ambient_segment_requires_lower_filling() {
        let space = AlignedSpace::new(vec![axis(2, 3, 10)], true).unwrap();
        let seg = space.flat_ambient_segment().unwrap();
        assert_eq!(seg.start, 2);
        assert_eq!(seg.size, Some(3));
    }

    #[test]
    fn invalid_space_rejects_non_contiguous_prefix() {
        // dim 0 partial (size 2 of 5) but not size 1, dim 1 partial too: illegal.
        let bad = vec![
            axis(0, 2, 5),
            axis(0, 1, 2),
        ];
        assert!(AlignedSpace::new(bad, true).is_err());
    }

    #[test]
    fn grid_row_major_order() {
        let space = AlignedSpace::new(
            vec![axis(0, 2, 2), axis(0, 2, 2)],
            true,
        )
        .unwrap();
        let points: Vec<_> = space.grid().collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], vec![Primitive::Int(0), Primitive::Int(0)]);
        assert_eq!(points[1], vec![Primitive::Int(0), Primitive::Int(1)]);
        assert_eq!(points[2], vec![Primitive::Int(1), Primitive::Int(0)]);
        assert_eq!(points[3], vec![Primitive::Int(1), Primitive::Int(1)]);
    }

    #[test]
    fn loom_round_trips_flat_index() {
        let space = AlignedSpace::new(vec![axis(0, 3, 3), axis(0, 4, 4)], true).unwrap();
        let strides = space.lower_element_num_by_dim();
        assert_eq!(strides, vec![4, 1]);
        assert_eq!(loom_by_flat_index(5, &strides), vec![1, 1]);
        assert_eq!(loom_by_flat_index(11, &strides), vec![2, 3]);
    }
}
