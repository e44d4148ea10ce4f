//! Loss-less textual encoding of scalar primitive values.
//!
//! `bool` round-trips as a native literal, `int` as a sign-prefixed
//! big-endian hex literal (`-0x1`), and `float` as a C99 hex-float literal
//! that preserves every mantissa bit (`0x1.999999999999ap-4`). Vectors are
//! just sequences of the scalar encoding. Pure: no side effects, no hidden
//! state.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three primitive kinds a study's parameters or results can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded scalar value. Equality on `Float` is bit-exact, not numeric,
/// so that two payloads decode-equal iff their encodings were identical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Primitive {
    pub fn value_type(&self) -> ValueType {
        match self {
            Primitive::Bool(_) => ValueType::Bool,
            Primitive::Int(_) => ValueType::Int,
            Primitive::Float(_) => ValueType::Float,
        }
    }

    /// Bit-exact comparison, treating NaN as equal to itself so a
    /// `FindExact` target of NaN is reachable.
    pub fn bit_exact_eq(&self, other: &Primitive) -> bool {
        match (self, other) {
            (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
            (Primitive::Int(a), Primitive::Int(b)) => a == b,
            (Primitive::Float(a), Primitive::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

fn malformed(value_type: &'static str, payload: &str) -> CodecError {
    CodecError::Malformed {
        value_type,
        payload: payload.to_string(),
    }
}

/// Encodes a primitive as its loss-less textual payload, failing if the
/// primitive's runtime variant does not match `expected`.
pub fn encode(value: &Primitive, expected: ValueType) -> Result<String, CodecError> {
    if value.value_type() != expected {
        return Err(CodecError::TypeMismatch {
            expected: expected.name(),
            found: value.value_type().name(),
        });
    }
    Ok(match value {
        Primitive::Bool(b) => encode_bool(*b),
        Primitive::Int(i) => encode_int(*i),
        Primitive::Float(f) => encode_float(*f),
    })
}

/// Decodes a payload into a primitive of the requested type.
pub fn decode(payload: &str, value_type: ValueType) -> Result<Primitive, CodecError> {
    match value_type {
        ValueType::Bool => decode_bool(payload).map(Primitive::Bool),
        ValueType::Int => decode_int(payload).map(Primitive::Int),
        ValueType::Float => decode_float(payload).map(Primitive::Float),
    }
}

pub fn encode_bool(b: bool) -> String {
    b.to_string()
}

pub fn decode_bool(payload: &str) -> Result<bool, CodecError> {
    match payload {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(malformed("bool", payload)),
    }
}

pub fn encode_int(v: i64) -> String {
    if v < 0 {
        format!("-0x{:x}", v.unsigned_abs())
    } else {
        format!("0x{:x}", v)
    }
}

pub fn decode_int(payload: &str) -> Result<i64, CodecError> {
    let (neg, rest) = match payload.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, payload),
    };
    let hex = rest
        .strip_prefix("0x")
        .ok_or_else(|| malformed("int", payload))?;
    if hex.is_empty() {
        return Err(malformed("int", payload));
    }
    let magnitude =
        u64::from_str_radix(hex, 16).map_err(|_| malformed("int", payload))? as i128;
    let signed = if neg { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| malformed("int", payload))
}

/// Encodes as a fixed 13-hex-digit mantissa C99 hex-float literal so the
/// round trip is always bit-exact regardless of how many significant bits
/// the value actually carries.
pub fn encode_float(v: f64) -> String {
    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exp_bits = (bits >> 52) & 0x7ff;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;

    if exp_bits == 0x7ff {
        return if mantissa == 0 {
            format!("{sign}inf")
        } else {
            "nan".to_string()
        };
    }
    if exp_bits == 0 && mantissa == 0 {
        return format!("{sign}0x0p+0");
    }
    let (leading, exp) = if exp_bits == 0 {
        (0u64, -1022i32)
    } else {
        (1u64, exp_bits as i32 - 1023)
    };
    let exp_sign = if exp < 0 { "-" } else { "+" };
    format!("{sign}0x{leading}.{mantissa:013x}p{exp_sign}{}", exp.abs())
}

pub fn decode_float(payload: &str) -> Result<f64, CodecError> {
    let err = || malformed("float", payload);
    let (neg, rest) = match payload.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, payload),
    };
    if rest == "inf" {
        return Ok(if neg { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    if rest == "nan" {
        return Ok(f64::NAN);
    }
    let rest = rest.strip_prefix("0x").ok_or_else(err)?;
    let p_at = rest.find(['p', 'P']).ok_or_else(err)?;
    let (mantissa_part, exp_part) = rest.split_at(p_at);
    let exp_part = &exp_part[1..];
    let exp: i32 = exp_part.parse().map_err(|_| err())?;

    let (int_part, frac_part) = match mantissa_part.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa_part, ""),
    };
    let leading = if int_part.is_empty() {
        0u64
    } else {
        u64::from_str_radix(int_part, 16).map_err(|_| err())?
    };
    if frac_part.len() > 13 {
        return Err(err());
    }
    let mut frac = frac_part.to_string();
    while frac.len() < 13 {
        frac.push('0');
    }
    let mantissa = if frac.is_empty() {
        0
    } else {
        u64::from_str_radix(&frac, 16).map_err(|_| err())?
    };

    if leading == 0 && mantissa == 0 && exp == 0 {
        let bits: u64 = if neg { 1 << 63 } else { 0 };
        return Ok(f64::from_bits(bits));
    }

    let (exp_bits, mantissa_bits) = match leading {
        1 => {
            let e = exp + 1023;
            if e <= 0 || e >= 0x7ff {
                return Err(err());
            }
            (e as u64, mantissa)
        }
        0 => {
            if exp != -1022 {
                return Err(err());
            }
            (0u64, mantissa)
        }
        _ => return Err(err()),
    };
    let sign_bit: u64 = if neg { 1 } else { 0 };
    let bits = (sign_bit << 63) | (exp_bits << 52) | mantissa_bits;
    Ok(f64::from_bits(bits))
}

/// Encodes a vector of primitives sharing a value type.
pub fn encode_vector(values: &[Primitive], expected: ValueType) -> Result<Vec<String>, CodecError> {
    values.iter().map(|v| encode(v, expected)).collect()
}

/// Decodes a vector of payloads sharing a value type.
pub fn decode_vector(payloads: &[String], value_type: ValueType) -> Result<Vec<Primitive>, CodecError> {
    payloads.iter().map(|p| decode(p, value_type)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_round_trip() {
        for b in [true, false] {
            let s = encode_bool(b);
            assert_eq!(decode_bool(&s).unwrap(), b);
        }
    }

    #[test]
    fn int_round_trip_including_negative() {
        for v in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            let s = encode_int(v);
            assert_eq!(decode_int(&s).unwrap(), v, "payload was {s:?}");
        }
        assert_eq!(encode_int(-1), "-0x1");
        assert_eq!(encode_int(255), "0xff");
    }

    #[test]
    fn float_round_trip_bit_exact() {
        for v in [
            0.0,
            -0.0,
            0.1,
            -0.1,
            1.0,
            f64::MIN_POSITIVE,
            f64::MAX,
            f64::MIN,
            1e300,
            -1e-300,
            std::f64::consts::PI,
        ] {
            let s = encode_float(v);
            let back = decode_float(&s).unwrap();
            assert_eq!(back.to_bits(), v.to_bits(), "payload was {s:?}");
        }
    }

    #[test]
    fn float_matches_known_literal() {
        assert_eq!(encode_float(0.1), "0x1.999999999999ap-4");
    }

    #[test]
    fn float_infinities_and_nan() {
        assert_eq!(encode_float(f64::INFINITY), "inf");
        assert_eq!(encode_float(f64::NEG_INFINITY), "-inf");
        assert!(decode_float("nan").unwrap().is_nan());
        assert_eq!(decode_float("inf").unwrap(), f64::INFINITY);
        assert_eq!(decode_float("-inf").unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(decode_int("0xzz").is_err());
        assert!(decode_int("123").is_err());
        assert!(decode_bool("True").is_err());
        assert!(decode_float("1.0").is_err());
        assert!(encode(&Primitive::Bool(true), ValueType::Int).is_err());
    }

    #[test]
    fn vector_round_trip() {
        let values = vec![Primitive::Int(1), Primitive::Int(-2), Primitive::Int(3)];
        let encoded = encode_vector(&values, ValueType::Int).unwrap();
        let decoded = decode_vector(&encoded, ValueType::Int).unwrap();
        assert_eq!(values.len(), decoded.len());
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert!(a.bit_exact_eq(b));
        }
    }
}
