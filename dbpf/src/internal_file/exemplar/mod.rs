// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exemplar and Cohort property bags.

mod binary;
pub mod patch;
mod text;

use std::collections::HashMap;

use derive_more::{Display, TryFrom};
use enum_iterator::Sequence;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
	buffer::ReadBuffer,
	error::{DbpfError, Result},
	tgi::Tgi,
};

pub const EXEMPLAR_BINARY_TAG: &[u8; 8] = b"EQZB1###";
pub const COHORT_BINARY_TAG: &[u8; 8] = b"CQZB1###";
pub const EXEMPLAR_TEXT_TAG: &[u8; 8] = b"EQZT1###";
pub const COHORT_TEXT_TAG: &[u8; 8] = b"CQZT1###";

/// Property id of the exemplar type marker
pub const EXEMPLAR_TYPE: u32 = 0x00000010;
/// Property id of the exemplar name
pub const EXEMPLAR_NAME: u32 = 0x00000020;

#[repr(u16)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Sequence, TryFrom, Serialize, Deserialize)]
#[try_from(repr)]
pub enum PropertyValueType {
	UInt8 = 0x0100,
	UInt16 = 0x0200,
	UInt32 = 0x0300,
	SInt32 = 0x0700,
	SInt64 = 0x0800,
	Float32 = 0x0900,
	Bool = 0x0B00,
	String = 0x0C00,
}

impl PropertyValueType {
	/// Encoded size of a single value; for strings, of a single character.
	pub fn width(self) -> usize {
		match self {
			PropertyValueType::UInt8 | PropertyValueType::Bool | PropertyValueType::String => 1,
			PropertyValueType::UInt16 => 2,
			PropertyValueType::UInt32 | PropertyValueType::SInt32 | PropertyValueType::Float32 => 4,
			PropertyValueType::SInt64 => 8,
		}
	}
}

#[repr(u16)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, TryFrom)]
#[try_from(repr)]
pub enum KeyType {
	Single = 0x00,
	Multi = 0x80,
}

/// A single value, or a repeated one with an explicit count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values<T> {
	Single(T),
	Multi(Vec<T>),
}

impl<T> Values<T> {
	pub fn as_slice(&self) -> &[T] {
		match self {
			Values::Single(value) => std::slice::from_ref(value),
			Values::Multi(values) => values,
		}
	}

	pub fn len(&self) -> usize {
		self.as_slice().len()
	}

	pub fn is_empty(&self) -> bool {
		self.as_slice().is_empty()
	}

	/// A repeated value of exactly one element is stored as a single one.
	pub fn normalized(self) -> Self {
		match self {
			Values::Multi(mut values) if values.len() == 1 => Values::Single(values.remove(0)),
			other => other,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
	UInt8(Values<u8>),
	UInt16(Values<u16>),
	UInt32(Values<u32>),
	SInt32(Values<i32>),
	SInt64(Values<i64>),
	Float32(Values<f32>),
	Bool(Values<bool>),
	String(String),
}

macro_rules! property_value_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(value: $t) -> Self {
                    PropertyValue::$variant(Values::Single(value))
                }
            }

            impl From<Vec<$t>> for PropertyValue {
                fn from(values: Vec<$t>) -> Self {
                    PropertyValue::$variant(Values::Multi(values))
                }
            }
        )*
    };
}

property_value_from!(u8 => UInt8, u16 => UInt16, u32 => UInt32, i32 => SInt32, i64 => SInt64, f32 => Float32, bool => Bool);

impl From<String> for PropertyValue {
	fn from(value: String) -> Self {
		PropertyValue::String(value)
	}
}

impl From<&str> for PropertyValue {
	fn from(value: &str) -> Self {
		PropertyValue::String(value.to_string())
	}
}

impl PropertyValue {
	pub fn value_type(&self) -> PropertyValueType {
		match self {
			PropertyValue::UInt8(_) => PropertyValueType::UInt8,
			PropertyValue::UInt16(_) => PropertyValueType::UInt16,
			PropertyValue::UInt32(_) => PropertyValueType::UInt32,
			PropertyValue::SInt32(_) => PropertyValueType::SInt32,
			PropertyValue::SInt64(_) => PropertyValueType::SInt64,
			PropertyValue::Float32(_) => PropertyValueType::Float32,
			PropertyValue::Bool(_) => PropertyValueType::Bool,
			PropertyValue::String(_) => PropertyValueType::String,
		}
	}

	pub fn normalized(self) -> Self {
		match self {
			PropertyValue::UInt8(v) => PropertyValue::UInt8(v.normalized()),
			PropertyValue::UInt16(v) => PropertyValue::UInt16(v.normalized()),
			PropertyValue::UInt32(v) => PropertyValue::UInt32(v.normalized()),
			PropertyValue::SInt32(v) => PropertyValue::SInt32(v.normalized()),
			PropertyValue::SInt64(v) => PropertyValue::SInt64(v.normalized()),
			PropertyValue::Float32(v) => PropertyValue::Float32(v.normalized()),
			PropertyValue::Bool(v) => PropertyValue::Bool(v.normalized()),
			PropertyValue::String(s) => PropertyValue::String(s),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
	pub id: u32,
	#[serde(flatten)]
	pub value: PropertyValue,
}

impl Property {
	pub fn new(id: u32, value: impl Into<PropertyValue>) -> Self {
		Self {
			id,
			value: value.into(),
		}
	}

	pub fn value_type(&self) -> PropertyValueType {
		self.value.value_type()
	}
}

/// Name and type of a property, as listed in the property definitions shipped with modding tools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
	pub name: String,
	pub value_type: PropertyValueType,
}

pub type PropertyInfoTable = HashMap<u32, PropertyInfo>;

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemplarData {
	pub is_cohort: bool,
	pub parent_cohort: Tgi,
	pub properties: IndexMap<u32, Property>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Format {
	Binary,
	Text,
}

impl ExemplarData {
	pub fn new(is_cohort: bool, parent_cohort: Tgi) -> Self {
		Self {
			is_cohort,
			parent_cohort,
			properties: IndexMap::new(),
		}
	}

	/// Adds or replaces a property, keeping the position of a replaced one.
	pub fn insert(&mut self, property: Property) -> Option<Property> {
		self.properties.insert(property.id, property)
	}

	pub fn get(&self, id: u32) -> Option<&Property> {
		self.properties.get(&id)
	}

	pub fn decode(data: &[u8]) -> Result<Self> {
		let mut buf = ReadBuffer::new(data);
		let tag = buf.read_bytes(8, None)?;
		let (is_cohort, format) = match &tag[..4] {
			b"EQZB" => (false, Format::Binary),
			b"CQZB" => (true, Format::Binary),
			b"EQZT" => (false, Format::Text),
			b"CQZT" => (true, Format::Text),
			_ => {
				return Err(DbpfError::ProtocolViolation(format!(
					"unknown exemplar tag {:?}",
					String::from_utf8_lossy(tag)
				)))
			}
		};
		match format {
			Format::Binary => binary::decode(&mut buf, is_cohort),
			Format::Text => text::decode(&mut buf, is_cohort),
		}
	}

	/// Encodes the record in the binary format.
	pub fn encode(&self) -> Result<Vec<u8>> {
		binary::encode(self)
	}

	/// Renders the record in the text format, taking property names from `info` when given.
	pub fn to_text(&self, info: Option<&PropertyInfoTable>) -> Result<String> {
		text::encode(self, info)
	}

	/// The record as it reads back after encoding: one element lists become single values.
	pub fn normalized(&self) -> Self {
		Self {
			is_cohort: self.is_cohort,
			parent_cohort: self.parent_cohort,
			properties: self
				.properties
				.iter()
				.map(|(&id, property)| {
					(id, Property {
						id,
						value: property.value.clone().normalized(),
					})
				})
				.collect(),
		}
	}
}
