//! A set of parameter points that do not sit on a single axis-aligned
//! grid — the fallback a [`crate::suggest::SequentialSuggest`] falls back
//! to when `strict_aligned` is false and the dimensional decomposition
//! would otherwise carve too many slivers.

use super::aligned::AlignedSpace;
use super::segment::{Axis, AxisModel, BoolAxis, DummyAxis, FloatAxis, IntAxis, StepValue};
use crate::codec::{self, Primitive, ValueType};
use crate::error::ParameterError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Explicit enumeration of points, each tagged with its position in the
/// ambient grid it was drawn from. `axes_info[i]` carries the metadata
/// (name, step, ambient_size) for coordinate `i` of every point.
#[derive(Debug, Clone, PartialEq)]
pub struct JaggedSpace {
    points: Vec<Vec<Primitive>>,
    ambient_indices: Vec<Vec<i64>>,
    axes_info: Vec<DummyAxis>,
}

impl JaggedSpace {
    pub fn new(
        points: Vec<Vec<Primitive>>,
        ambient_indices: Vec<Vec<i64>>,
        axes_info: Vec<DummyAxis>,
    ) -> Result<Self, ParameterError> {
        if points.len() != ambient_indices.len() {
            return Err(ParameterError::new(
                "jagged space points and ambient_indices must have equal length",
            ));
        }
        for (point, index) in points.iter().zip(&ambient_indices) {
            if point.len() != axes_info.len() || index.len() != axes_info.len() {
                return Err(ParameterError::new(
                    "jagged space point/ambient_index arity must match axes_info",
                ));
            }
        }
        Ok(Self {
            points,
            ambient_indices,
            axes_info,
        })
    }

    pub fn dim(&self) -> usize {
        self.axes_info.len()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn grid(&self) -> impl Iterator<Item = &Vec<Primitive>> {
        self.points.iter()
    }

    pub fn axes_info(&self) -> &[DummyAxis] {
        &self.axes_info
    }

    /// Projects each point into a unit-width `AlignedSpace` (size 1 on
    /// every axis) and orders the result by its ambient-index tail (every
    /// axis but 0) so points that share everything but their outermost
    /// coordinate land next to each other, ready for a dimension-0
    /// `simplify` pass.
    pub fn to_aligned_list(&self) -> Result<Vec<AlignedSpace>, ParameterError> {
        let mut by_tail: BTreeMap<Vec<i64>, Vec<usize>> = BTreeMap::new();
        for (i, index) in self.ambient_indices.iter().enumerate() {
            let tail = index.get(1..).unwrap_or(&[]).to_vec();
            by_tail.entry(tail).or_default().push(i);
        }

        let mut out = Vec::with_capacity(self.points.len());
        for (_, mut members) in by_tail {
            members.sort_by_key(|&i| self.ambient_indices[i][0]);
            for i in members {
                out.push(self.unit_space_at(i)?);
            }
        }
        Ok(out)
    }

    fn unit_space_at(&self, i: usize) -> Result<AlignedSpace, ParameterError> {
        let axes = (0..self.dim())
            .map(|d| point_to_unit_axis(&self.axes_info[d], self.ambient_indices[i][d], &self.points[i][d]))
            .collect::<Result<Vec<_>, _>>()?;
        AlignedSpace::new(axes, true).map_err(|e| ParameterError::new(e.0))
    }

    pub fn to_model(&self) -> JaggedSpaceModel {
        JaggedSpaceModel {
            axes: self
                .axes_info
                .iter()
                .map(|a| Axis::Dummy(a.clone()).to_model())
                .collect(),
            points: self
                .points
                .iter()
                .map(|point| {
                    point
                        .iter()
                        .zip(&self.axes_info)
                        .map(|(v, a)| codec::encode(v, a.value_type).expect("point value type matches axis"))
                        .collect()
                })
                .collect(),
            ambient_indices: self
                .ambient_indices
                .iter()
                .map(|idx| idx.iter().map(|i| codec::encode_int(*i)).collect())
                .collect(),
        }
    }

    pub fn from_model(model: &JaggedSpaceModel) -> Result<Self, ParameterError> {
        let axes_info = model
            .axes
            .iter()
            .map(|m| match Axis::from_model(m)? {
                Axis::Dummy(d) => Ok(d),
                _ => Err(ParameterError::new("jagged space axis model must be dummy")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let points = model
            .points
            .iter()
            .map(|point| {
                point
                    .iter()
                    .zip(&axes_info)
                    .map(|(s, a)| codec::decode(s, a.value_type))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ParameterError::new(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ambient_indices = model
            .ambient_indices
            .iter()
            .map(|idx| {
                idx.iter()
                    .map(|s| codec::decode_int(s))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ParameterError::new(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        JaggedSpace::new(points, ambient_indices, axes_info)
    }
}

fn point_to_unit_axis(info: &DummyAxis, ambient_index: i64, value: &Primitive) -> Result<Axis, ParameterError> {
    let bad = || ParameterError::new("jagged point value type does not match axes_info");
    match (info.value_type, value) {
        (ValueType::Bool, Primitive::Bool(b)) => Ok(Axis::Bool(BoolAxis {
            name: Some(info.name.clone()),
            start: *b,
            size: 1,
            ambient_index,
            ambient_size: info.ambient_size.ok_or_else(bad)?,
        })),
        (ValueType::Int, Primitive::Int(v)) => {
            let step = match info.step {
                StepValue::Int(s) => s,
                StepValue::Float(_) => return Err(bad()),
            };
            Ok(Axis::Int(IntAxis {
                name: Some(info.name.clone()),
                start: *v,
                step,
                size: Some(1),
                ambient_index,
                ambient_size: info.ambient_size,
            }))
        }
        (ValueType::Float, Primitive::Float(v)) => {
            let step = match info.step {
                StepValue::Float(s) => s,
                StepValue::Int(_) => return Err(bad()),
            };
            Ok(Axis::Float(FloatAxis {
                name: Some(info.name.clone()),
                start: *v,
                step,
                size: Some(1),
                ambient_index,
                ambient_size: info.ambient_size,
            }))
        }
        _ => Err(bad()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JaggedSpaceModel {
    pub axes: Vec<AxisModel>,
    pub points: Vec<Vec<String>>,
    pub ambient_indices: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, vt: ValueType, step: StepValue, ambient_size: Option<i64>) -> DummyAxis {
        DummyAxis {
            name: name.to_string(),
            value_type: vt,
            step,
            ambient_size,
        }
    }

    #[test]
    fn to_aligned_list_groups_by_tail() {
        let axes_info = vec![
            info("x", ValueType::Int, StepValue::Int(1), Some(10)),
            info("y", ValueType::Int, StepValue::Int(1), Some(10)),
        ];
        let points = vec![
            vec![Primitive::Int(3), Primitive::Int(0)],
            vec![Primitive::Int(1), Primitive::Int(0)],
            vec![Primitive::Int(2), Primitive::Int(1)],
        ];
        let ambient_indices = vec![vec![3, 0], vec![1, 0], vec![2, 1]];
        let space = JaggedSpace::new(points, ambient_indices, axes_info).unwrap();
        let list = space.to_aligned_list().unwrap();
        assert_eq!(list.len(), 3);
        // tail [0] group comes first (sorted key), ordered by ambient index 0 ascending.
        assert_eq!(list[0].get_start_index(0), 1);
        assert_eq!(list[1].get_start_index(0), 3);
        assert_eq!(list[2].get_start_index(0), 2);
    }

    #[test]
    fn rejects_mismatched_arity() {
        let axes_info = vec![info("x", ValueType::Int, StepValue::Int(1), Some(10))];
        let points = vec![vec![Primitive::Int(1), Primitive::Int(2)]];
        let ambient_indices = vec![vec![1]];
        assert!(JaggedSpace::new(points, ambient_indices, axes_info).is_err());
    }

    #[test]
    fn model_round_trip() {
        let axes_info = vec![info("x", ValueType::Float, StepValue::Float(0.5), Some(4))];
        let points = vec![vec![Primitive::Float(1.5)]];
        let ambient_indices = vec![vec![2]];
        let space = JaggedSpace::new(points, ambient_indices, axes_info).unwrap();
        let model = space.to_model();
        let back = JaggedSpace::from_model(&model).unwrap();
        assert_eq!(space, back);
    }
}
