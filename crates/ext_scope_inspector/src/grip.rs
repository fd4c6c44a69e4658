//! Value grips: transport-safe descriptors of debuggee values.
//!
//! Primitives travel inline. Everything JSON cannot represent faithfully
//! (undefined, NaN, -0, objects, unavailable bindings) travels as a typed
//! object `{"type": ...}`.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::DebuggeeValue;

/// Wire descriptor for one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Grip {
    Bool(bool),
    Number(f64),
    String(String),
    Undefined,
    Null,
    NaN,
    Infinity,
    NegativeInfinity,
    NegativeZero,
    Object { actor: String, class: String },
    OptimizedOut,
    Uninitialized,
    MissingArguments,
}

impl Serialize for Grip {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grip::Bool(b) => serializer.serialize_bool(*b),
            Grip::Number(n) => serialize_number(serializer, *n),
            Grip::String(s) => serializer.serialize_str(s),
            Grip::Undefined => typed(serializer, "undefined"),
            Grip::Null => typed(serializer, "null"),
            Grip::NaN => typed(serializer, "NaN"),
            Grip::Infinity => typed(serializer, "Infinity"),
            Grip::NegativeInfinity => typed(serializer, "-Infinity"),
            Grip::NegativeZero => typed(serializer, "-0"),
            Grip::Object { actor, class } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "object")?;
                map.serialize_entry("actor", actor)?;
                map.serialize_entry("class", class)?;
                map.end()
            }
            Grip::OptimizedOut => flagged_null(serializer, "optimizedOut"),
            Grip::Uninitialized => flagged_null(serializer, "uninitialized"),
            Grip::MissingArguments => flagged_null(serializer, "missingArguments"),
        }
    }
}

/// Largest magnitude below which every integral double is exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn serialize_number<S: Serializer>(serializer: S, n: f64) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

fn typed<S: Serializer>(serializer: S, kind: &str) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry("type", kind)?;
    map.end()
}

fn flagged_null<S: Serializer>(serializer: S, flag: &str) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("type", "null")?;
    map.serialize_entry(flag, &true)?;
    map.end()
}

/// Turns debuggee values into grips.
///
/// The thread actor owns one encoder and hands it every value that leaves the
/// inspector. Implementations that keep object actors alive (pause-scoped
/// object pools, long-string actors) plug in here.
pub trait GripEncoder {
    fn encode(&self, value: &DebuggeeValue) -> Grip;
}

/// Stateless encoder. Object grips name a deterministic actor derived from
/// the object's identity, so encoding the same value twice yields the same
/// grip.
#[derive(Debug, Clone)]
pub struct DefaultGripEncoder {
    object_actor_prefix: String,
}

impl DefaultGripEncoder {
    pub fn new(object_actor_prefix: impl Into<String>) -> Self {
        Self {
            object_actor_prefix: object_actor_prefix.into(),
        }
    }
}

impl GripEncoder for DefaultGripEncoder {
    fn encode(&self, value: &DebuggeeValue) -> Grip {
        match value {
            DebuggeeValue::Undefined => Grip::Undefined,
            DebuggeeValue::Null => Grip::Null,
            DebuggeeValue::Bool(b) => Grip::Bool(*b),
            DebuggeeValue::Number(n) => encode_number(*n),
            DebuggeeValue::String(s) => Grip::String(s.clone()),
            DebuggeeValue::Object(obj) => Grip::Object {
                actor: format!("{}{}", self.object_actor_prefix, obj.id),
                class: obj.class.clone(),
            },
            DebuggeeValue::OptimizedOut => Grip::OptimizedOut,
            DebuggeeValue::Uninitialized => Grip::Uninitialized,
            DebuggeeValue::MissingArguments => Grip::MissingArguments,
        }
    }
}

fn encode_number(n: f64) -> Grip {
    if n.is_nan() {
        Grip::NaN
    } else if n == f64::INFINITY {
        Grip::Infinity
    } else if n == f64::NEG_INFINITY {
        Grip::NegativeInfinity
    } else if n == 0.0 && n.is_sign_negative() {
        Grip::NegativeZero
    } else {
        Grip::Number(n)
    }
}
