//! Property-list value model.
//!
//! Grammar bundles are property lists on disk (XML or JSON flavored). The
//! readers that parse those files live elsewhere; this crate defines the
//! already-parsed tree they produce and the loader consumes: an ordered
//! dictionary of scalars, arrays, and nested dictionaries.
//!
//! Dictionary entries keep their declaration order. Grammar semantics depend
//! on it in two places: `patterns` arrays are match-priority ordered, and
//! repository iteration order determines rule-id assignment order.

use indexmap::IndexMap;

/// A single property-list value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
	Dict(Plist),
	Array(Vec<PlistValue>),
	String(String),
	Integer(i64),
	Real(f64),
	Boolean(bool),
}

impl PlistValue {
	/// Returns the nested dictionary, or `None` for any other variant.
	pub fn as_dict(&self) -> Option<&Plist> {
		match self {
			PlistValue::Dict(dict) => Some(dict),
			_ => None,
		}
	}

	/// Returns the array elements, or `None` for any other variant.
	pub fn as_array(&self) -> Option<&[PlistValue]> {
		match self {
			PlistValue::Array(values) => Some(values),
			_ => None,
		}
	}

	/// Returns the string contents, or `None` for any other variant.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PlistValue::String(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			PlistValue::Integer(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_real(&self) -> Option<f64> {
		match self {
			PlistValue::Real(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_boolean(&self) -> Option<bool> {
		match self {
			PlistValue::Boolean(value) => Some(*value),
			_ => None,
		}
	}
}

/// An insertion-ordered string-keyed dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plist {
	entries: IndexMap<String, PlistValue>,
}

impl Plist {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true if `key` is present.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&PlistValue> {
		self.entries.get(key)
	}

	/// Inserts a value, replacing any previous entry under the same key.
	///
	/// A replaced key keeps its original position, matching plist reader
	/// behavior for duplicate keys.
	pub fn insert(&mut self, key: impl Into<String>, value: PlistValue) {
		self.entries.insert(key.into(), value);
	}

	/// Iterates entries in declaration order.
	pub fn entries(&self) -> impl Iterator<Item = (&str, &PlistValue)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl FromIterator<(String, PlistValue)> for Plist {
	fn from_iter<I: IntoIterator<Item = (String, PlistValue)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

#[cfg(feature = "json")]
mod json {
	use super::{Plist, PlistValue};

	/// Error converting parsed JSON into the plist model.
	#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
	pub enum FromJsonError {
		/// JSON `null` has no property-list representation.
		#[error("null has no property-list representation")]
		Null,

		/// A JSON number that fits neither `i64` nor `f64` exactly.
		#[error("unrepresentable number: {0}")]
		UnrepresentableNumber(String),

		/// The top-level value of a grammar file must be a dictionary.
		#[error("top-level value is not a dictionary")]
		NotADictionary,
	}

	impl TryFrom<serde_json::Value> for PlistValue {
		type Error = FromJsonError;

		fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
			match value {
				serde_json::Value::Null => Err(FromJsonError::Null),
				serde_json::Value::Bool(flag) => Ok(PlistValue::Boolean(flag)),
				serde_json::Value::Number(number) => {
					if let Some(int) = number.as_i64() {
						Ok(PlistValue::Integer(int))
					} else if let Some(real) = number.as_f64() {
						Ok(PlistValue::Real(real))
					} else {
						Err(FromJsonError::UnrepresentableNumber(number.to_string()))
					}
				}
				serde_json::Value::String(text) => Ok(PlistValue::String(text)),
				serde_json::Value::Array(values) => Ok(PlistValue::Array(
					values
						.into_iter()
						.map(PlistValue::try_from)
						.collect::<Result<_, _>>()?,
				)),
				serde_json::Value::Object(fields) => {
					let mut dict = Plist::new();
					for (key, field) in fields {
						dict.insert(key, PlistValue::try_from(field)?);
					}
					Ok(PlistValue::Dict(dict))
				}
			}
		}
	}

	impl TryFrom<serde_json::Value> for Plist {
		type Error = FromJsonError;

		fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
			match PlistValue::try_from(value)? {
				PlistValue::Dict(dict) => Ok(dict),
				_ => Err(FromJsonError::NotADictionary),
			}
		}
	}
}

#[cfg(feature = "json")]
pub use json::FromJsonError;

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn entries_keep_declaration_order() {
		let mut dict = Plist::new();
		dict.insert("zeta", PlistValue::Integer(1));
		dict.insert("alpha", PlistValue::Integer(2));
		dict.insert("mid", PlistValue::Integer(3));

		let keys: Vec<&str> = dict.entries().map(|(key, _)| key).collect();
		assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
	}

	#[test]
	fn insert_replaces_in_place() {
		let mut dict = Plist::new();
		dict.insert("a", PlistValue::Integer(1));
		dict.insert("b", PlistValue::Integer(2));
		dict.insert("a", PlistValue::Integer(3));

		let keys: Vec<&str> = dict.entries().map(|(key, _)| key).collect();
		assert_eq!(keys, vec!["a", "b"]);
		assert_eq!(dict.get("a").and_then(PlistValue::as_integer), Some(3));
	}

	#[test]
	fn scalar_accessors_are_total() {
		let text = PlistValue::String("source.js".into());
		assert_eq!(text.as_str(), Some("source.js"));
		assert_eq!(text.as_integer(), None);
		assert_eq!(text.as_dict(), None);
		assert_eq!(text.as_array(), None);
	}

	#[cfg(feature = "json")]
	mod from_json {
		use pretty_assertions::assert_eq;
		use serde_json::json;

		use crate::{FromJsonError, Plist, PlistValue};

		#[test]
		fn converts_nested_structures() {
			let dict = Plist::try_from(json!({
				"scopeName": "source.example",
				"patterns": [{"match": "\\d+", "name": "constant.numeric"}],
				"limit": 3,
				"ratio": 0.5,
				"enabled": true,
			}))
			.unwrap();

			assert_eq!(
				dict.get("scopeName").and_then(PlistValue::as_str),
				Some("source.example")
			);
			let patterns = dict.get("patterns").and_then(PlistValue::as_array).unwrap();
			assert_eq!(patterns.len(), 1);
			assert_eq!(
				patterns[0].as_dict().and_then(|p| p.get("name")).and_then(PlistValue::as_str),
				Some("constant.numeric")
			);
			assert_eq!(dict.get("limit").and_then(PlistValue::as_integer), Some(3));
			assert_eq!(dict.get("ratio").and_then(PlistValue::as_real), Some(0.5));
			assert_eq!(dict.get("enabled").and_then(PlistValue::as_boolean), Some(true));
		}

		#[test]
		fn top_level_must_be_a_dictionary() {
			assert_eq!(
				Plist::try_from(json!(["not", "a", "dict"])),
				Err(FromJsonError::NotADictionary)
			);
		}

		#[test]
		fn null_is_rejected() {
			let result = PlistValue::try_from(json!({"bad": null}));
			assert_eq!(result, Err(FromJsonError::Null));
		}

		#[test]
		fn integral_and_fractional_numbers_split() {
			assert_eq!(PlistValue::try_from(json!(7)).unwrap(), PlistValue::Integer(7));
			assert_eq!(PlistValue::try_from(json!(7.5)).unwrap(), PlistValue::Real(7.5));
		}

		#[test]
		fn object_order_survives_conversion() {
			let dict = Plist::try_from(json!({"c": 1, "a": 2, "b": 3})).unwrap();
			let keys: Vec<&str> = dict.entries().map(|(key, _)| key).collect();
			assert_eq!(keys, vec!["c", "a", "b"]);
		}
	}
}
