//! Typed argument values shared by commands, options and metadata.

use rosc::OscType;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The three value kinds that travel over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i32),
    Float(f32),
}

impl Value {
    /// Convert to string slice if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to i32, parsing strings and truncating floats
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::String(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i32),
        }
    }

    /// Convert to f32, parsing strings
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::String(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i as f32),
            Self::Float(f) => Some(*f),
        }
    }

    /// OSC type tag character.
    pub fn type_tag(&self) -> char {
        match self {
            Self::String(_) => 's',
            Self::Int(_) => 'i',
            Self::Float(_) => 'f',
        }
    }

    /// Convert a decoded OSC argument, rejecting types outside {s, i, f}.
    pub fn from_osc(arg: OscType) -> Option<Self> {
        match arg {
            OscType::String(s) => Some(Self::String(s)),
            OscType::Int(i) => Some(Self::Int(i)),
            OscType::Float(f) => Some(Self::Float(f)),
            _ => None,
        }
    }
}

impl From<Value> for OscType {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => OscType::String(s),
            Value::Int(i) => OscType::Int(i),
            Value::Float(f) => OscType::Float(f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl TryFrom<u32> for Value {
    type Error = Error;

    fn try_from(i: u32) -> Result<Self> {
        i32::try_from(i)
            .map(Self::Int)
            .map_err(|_| Error::InvalidCommand(format!("{} does not fit an OSC int", i)))
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f as f32)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Int(b as i32)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}
