//! A single reserved slice of a study's grid, the mappings it produced,
//! and the wire schema a worker exchanges it through.

use crate::codec::{self, Primitive, ValueType};
use crate::error::CodecError;
use crate::space::{ParameterSpace, ParameterSpaceModel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Scalar,
    Vector,
}

impl ResultType {
    pub fn name(&self) -> &'static str {
        match self {
            ResultType::Scalar => "scalar",
            ResultType::Vector => "vector",
        }
    }
}

/// A scalar or vector result, always carrying values of one `ValueType`
/// (the study's `result_value_type`).
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Scalar(Primitive),
    Vector(Vec<Primitive>),
}

impl ResultValue {
    pub fn result_type(&self) -> ResultType {
        match self {
            ResultValue::Scalar(_) => ResultType::Scalar,
            ResultValue::Vector(_) => ResultType::Vector,
        }
    }

    /// Bit-exact equality used by `FindExact`'s completion predicate.
    pub fn bit_exact_eq(&self, other: &ResultValue) -> bool {
        match (self, other) {
            (ResultValue::Scalar(a), ResultValue::Scalar(b)) => a.bit_exact_eq(b),
            (ResultValue::Vector(a), ResultValue::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.bit_exact_eq(y))
            }
            _ => false,
        }
    }
}

/// One parameter point (or param-vector, for vector-valued studies) and
/// the result the worker computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub params: Vec<Primitive>,
    pub result: ResultValue,
}

/// Turns raw `(params, result)` pairs into `Mapping`s, validating every
/// result scalar against the study's declared `result_value_type` by
/// round-tripping it through the codec.
pub fn convert_mappings_from(
    pairs: Vec<(Vec<Primitive>, ResultValue)>,
    result_type: ResultType,
    result_value_type: ValueType,
) -> Result<Vec<Mapping>, CodecError> {
    pairs
        .into_iter()
        .map(|(params, result)| {
            if result.result_type() != result_type {
                return Err(CodecError::TypeMismatch {
                    expected: result_type.name(),
                    found: result.result_type().name(),
                });
            }
            match &result {
                ResultValue::Scalar(v) => {
                    codec::encode(v, result_value_type)?;
                }
                ResultValue::Vector(vs) => {
                    for v in vs {
                        codec::encode(v, result_value_type)?;
                    }
                }
            }
            Ok(Mapping { params, result })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub study_id: String,
    pub trial_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: TrialStatus,
    pub parameter_space: ParameterSpace,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    pub result: Option<Vec<Mapping>>,
}

impl Trial {
    pub fn to_model(&self) -> Result<TrialModel, CodecError> {
        Ok(TrialModel {
            study_id: self.study_id.clone(),
            trial_id: self.trial_id.clone(),
            timestamp: self.timestamp,
            status: self.status,
            parameter_space: self.parameter_space.to_model(),
            result_type: self.result_type,
            result_value_type: self.result_value_type,
            result: self
                .result
                .as_ref()
                .map(|mappings| {
                    mappings
                        .iter()
                        .map(|m| mapping_to_model(m, self.result_value_type))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?,
        })
    }

    pub fn from_model(model: TrialModel) -> Result<Trial, CodecError> {
        let parameter_space = ParameterSpace::from_model(&model.parameter_space)
            .map_err(|e| CodecError::Malformed {
                value_type: "parameter_space",
                payload: e.0,
            })?;
        let result = model
            .result
            .map(|mappings| {
                mappings
                    .into_iter()
                    .map(|m| mapping_from_model(m, model.result_value_type))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(Trial {
            study_id: model.study_id,
            trial_id: model.trial_id,
            timestamp: model.timestamp,
            status: model.status,
            parameter_space,
            result_type: model.result_type,
            result_value_type: model.result_value_type,
            result,
        })
    }
}

pub fn mapping_to_model(mapping: &Mapping, result_value_type: ValueType) -> Result<MappingModel, CodecError> {
    let params = mapping
        .params
        .iter()
        .map(|v| {
            Ok(ValueWire {
                value_type: v.value_type(),
                payload: codec::encode(v, v.value_type())?,
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;
    let result = match &mapping.result {
        ResultValue::Scalar(v) => ResultModel::Scalar(codec::encode(v, result_value_type)?),
        ResultValue::Vector(vs) => {
            ResultModel::Vector(codec::encode_vector(vs, result_value_type)?)
        }
    };
    Ok(MappingModel { params, result })
}

pub fn mapping_from_model(model: MappingModel, result_value_type: ValueType) -> Result<Mapping, CodecError> {
    let params = model
        .params
        .into_iter()
        .map(|w| codec::decode(&w.payload, w.value_type))
        .collect::<Result<Vec<_>, _>>()?;
    let result = match model.result {
        ResultModel::Scalar(s) => ResultValue::Scalar(codec::decode(&s, result_value_type)?),
        ResultModel::Vector(vs) => {
            ResultValue::Vector(codec::decode_vector(&vs, result_value_type)?)
        }
    };
    Ok(Mapping { params, result })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueWire {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultModel {
    Scalar(String),
    Vector(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingModel {
    pub params: Vec<ValueWire>,
    pub result: ResultModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialModel {
    pub study_id: String,
    pub trial_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: TrialStatus,
    pub parameter_space: ParameterSpaceModel,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
    #[serde(default)]
    pub result: Option<Vec<MappingModel>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::aligned::AlignedSpace;
    use crate::space::segment::{Axis, IntAxis};

    fn space() -> ParameterSpace {
        ParameterSpace::Aligned(
            AlignedSpace::new(
                vec![Axis::Int(IntAxis {
                    name: Some("x".into()),
                    start: 0,
                    step: 1,
                    size: Some(3),
                    ambient_index: 0,
                    ambient_size: Some(3),
                })],
                true,
            )
            .unwrap(),
        )
    }

    #[test]
    fn convert_mappings_validates_value_type() {
        let pairs = vec![(vec![Primitive::Int(0)], ResultValue::Scalar(Primitive::Float(1.0)))];
        let err = convert_mappings_from(pairs, ResultType::Scalar, ValueType::Int).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn trial_model_round_trip() {
        let trial = Trial {
            study_id: "s1".into(),
            trial_id: "s1-0x0".into(),
            timestamp: Utc::now(),
            status: TrialStatus::Done,
            parameter_space: space(),
            result_type: ResultType::Scalar,
            result_value_type: ValueType::Int,
            result: Some(vec![Mapping {
                params: vec![Primitive::Int(1)],
                result: ResultValue::Scalar(Primitive::Int(42)),
            }]),
        };
        let model = trial.to_model().unwrap();
        let back = Trial::from_model(model).unwrap();
        assert_eq!(trial, back);
    }
}
