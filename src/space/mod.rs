//! Parameter-space algebra: typed axes, axis-aligned N-D boxes, jagged
//! point sets, and the 1-D flattening/merge machinery that lets the trial
//! table reason about coverage without re-walking every point.

pub mod aligned;
pub mod flatten;
pub mod jagged;
pub mod segment;

use crate::codec::Primitive;
use crate::error::ParameterError;
use aligned::{AlignedSpace, AlignedSpaceModel};
use jagged::{JaggedSpace, JaggedSpaceModel};
use serde::{Deserialize, Serialize};

/// Either shape a study's or trial's parameter region can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSpace {
    Aligned(AlignedSpace),
    Jagged(JaggedSpace),
}

impl ParameterSpace {
    pub fn dim(&self) -> usize {
        match self {
            ParameterSpace::Aligned(s) => s.dim(),
            ParameterSpace::Jagged(s) => s.dim(),
        }
    }

    pub fn total(&self) -> Option<i64> {
        match self {
            ParameterSpace::Aligned(s) => s.total(),
            ParameterSpace::Jagged(s) => Some(s.len() as i64),
        }
    }

    pub fn grid(&self) -> Box<dyn Iterator<Item = Vec<Primitive>> + '_> {
        match self {
            ParameterSpace::Aligned(s) => s.grid(),
            ParameterSpace::Jagged(s) => Box::new(s.grid().cloned()),
        }
    }

    /// Projects to a list of unit-width aligned spaces: the identity for
    /// an already-aligned space, a per-point projection for a jagged one.
    /// This is what the trial table aggregates over regardless of shape.
    pub fn to_aligned_list(&self) -> Result<Vec<AlignedSpace>, ParameterError> {
        match self {
            ParameterSpace::Aligned(s) => Ok(vec![s.clone()]),
            ParameterSpace::Jagged(s) => s.to_aligned_list(),
        }
    }

    pub fn as_aligned(&self) -> Option<&AlignedSpace> {
        match self {
            ParameterSpace::Aligned(s) => Some(s),
            ParameterSpace::Jagged(_) => None,
        }
    }

    pub fn to_model(&self) -> ParameterSpaceModel {
        match self {
            ParameterSpace::Aligned(s) => ParameterSpaceModel::Aligned(s.to_model()),
            ParameterSpace::Jagged(s) => ParameterSpaceModel::Jagged(s.to_model()),
        }
    }

    pub fn from_model(model: &ParameterSpaceModel) -> Result<Self, ParameterError> {
        Ok(match model {
            ParameterSpaceModel::Aligned(m) => ParameterSpace::Aligned(AlignedSpace::from_model(m)?),
            ParameterSpaceModel::Jagged(m) => ParameterSpace::Jagged(JaggedSpace::from_model(m)?),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterSpaceModel {
    Aligned(AlignedSpaceModel),
    Jagged(JaggedSpaceModel),
}
