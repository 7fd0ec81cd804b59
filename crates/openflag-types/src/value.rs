//! Typed values carried by flags and evaluation contexts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A string-keyed map of values.
pub type Structure = HashMap<String, Value>;

/// A dynamically typed value.
///
/// Used for object flags, context attributes, hook hints and flag metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
	#[default]
	Null,
	Boolean(bool),
	Integer(i64),
	Double(f64),
	String(String),
	Instant(DateTime<Utc>),
	List(Vec<Value>),
	Structure(Structure),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Integer(n) => Some(*n),
			_ => None,
		}
	}

	/// Integers widen to doubles; nothing else converts.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Double(n) => Some(*n),
			Value::Integer(n) => Some(*n as f64),
			_ => None,
		}
	}

	pub fn as_instant(&self) -> Option<DateTime<Utc>> {
		match self {
			Value::Instant(t) => Some(*t),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_structure(&self) -> Option<&Structure> {
		match self {
			Value::Structure(fields) => Some(fields),
			_ => None,
		}
	}

	/// Name of the variant, used in type mismatch messages.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Boolean(_) => "boolean",
			Value::Integer(_) => "integer",
			Value::Double(_) => "double",
			Value::String(_) => "string",
			Value::Instant(_) => "instant",
			Value::List(_) => "list",
			Value::Structure(_) => "structure",
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Boolean(b)
	}
}

impl From<i64> for Value {
	fn from(n: i64) -> Self {
		Value::Integer(n)
	}
}

impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Integer(n.into())
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Double(n)
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(t: DateTime<Utc>) -> Self {
		Value::Instant(t)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::List(items)
	}
}

impl From<Structure> for Value {
	fn from(fields: Structure) -> Self {
		Value::Structure(fields)
	}
}
