// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sparse property level edits between two exemplars.
//!
//! A patch only carries untyped values; the property type is taken from the exemplar it is
//! applied to, or from a [`PropertyInfoTable`] for properties that do not exist there yet.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
	error::{DbpfError, Result},
	internal_file::exemplar::{
		ExemplarData, Property, PropertyInfoTable, PropertyValue, PropertyValueType, Values,
	},
	tgi::Tgi,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
	Bool(bool),
	Int(i64),
	Float(#[serde(serialize_with = "serialize_float")] f64),
	String(String),
}

/// JSON has no NaN or infinities, they are written as the strings `"NaN"`, `"inf"` and `"-inf"`.
fn serialize_float<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
	match non_finite_token(*value) {
		Some(token) => serializer.serialize_str(token),
		None => serializer.serialize_f64(*value),
	}
}

fn non_finite_token(value: f64) -> Option<&'static str> {
	if value.is_nan() {
		Some("NaN")
	} else if value.is_infinite() {
		Some(if value > 0.0 { "inf" } else { "-inf" })
	} else {
		None
	}
}

fn non_finite_from_token(token: &str) -> Option<f32> {
	match token {
		"NaN" => Some(f32::NAN),
		"inf" => Some(f32::INFINITY),
		"-inf" => Some(f32::NEG_INFINITY),
		_ => None,
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrVector {
	Scalar(Scalar),
	Vector(Vec<Scalar>),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Change<T> {
	#[default]
	Unchanged,
	Set(T),
	Deleted,
}

impl<T> Change<T> {
	pub fn is_unchanged(&self) -> bool {
		matches!(self, Change::Unchanged)
	}
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PatchRepr", into = "PatchRepr")]
pub struct ExemplarPatch {
	pub parent_cohort: Change<Tgi>,
	pub properties: IndexMap<u32, Change<ScalarOrVector>>,
}

/// JSON form: a missing `parentCohort` is unchanged, `null` clears it, and a `null` property is
/// deleted.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchRepr {
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		deserialize_with = "present"
	)]
	parent_cohort: Option<Option<Tgi>>,
	#[serde(default)]
	properties: IndexMap<u32, Option<ScalarOrVector>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::deserialize(deserializer).map(Some)
}

fn change_from_option<T>(value: Option<T>) -> Change<T> {
	value.map(Change::Set).unwrap_or(Change::Deleted)
}

fn change_into_option<T>(change: Change<T>) -> Option<Option<T>> {
	match change {
		Change::Unchanged => None,
		Change::Set(value) => Some(Some(value)),
		Change::Deleted => Some(None),
	}
}

impl From<PatchRepr> for ExemplarPatch {
	fn from(repr: PatchRepr) -> Self {
		Self {
			parent_cohort: repr
				.parent_cohort
				.map(change_from_option)
				.unwrap_or_default(),
			properties: repr
				.properties
				.into_iter()
				.map(|(id, value)| (id, change_from_option(value)))
				.collect(),
		}
	}
}

impl From<ExemplarPatch> for PatchRepr {
	fn from(patch: ExemplarPatch) -> Self {
		Self {
			parent_cohort: change_into_option(patch.parent_cohort),
			properties: patch
				.properties
				.into_iter()
				.filter_map(|(id, change)| change_into_option(change).map(|value| (id, value)))
				.collect(),
		}
	}
}

impl ExemplarPatch {
	pub fn is_empty(&self) -> bool {
		self.parent_cohort.is_unchanged() && self.properties.values().all(Change::is_unchanged)
	}
}

fn to_untyped(value: &PropertyValue) -> ScalarOrVector {
	fn values<T: Copy>(values: &Values<T>, scalar: impl Fn(T) -> Scalar) -> ScalarOrVector {
		match values {
			Values::Single(value) => ScalarOrVector::Scalar(scalar(*value)),
			Values::Multi(values) => {
				ScalarOrVector::Vector(values.iter().copied().map(scalar).collect())
			}
		}
	}
	match value {
		PropertyValue::UInt8(v) => values(v, |n| Scalar::Int(n.into())),
		PropertyValue::UInt16(v) => values(v, |n| Scalar::Int(n.into())),
		PropertyValue::UInt32(v) => values(v, |n| Scalar::Int(n.into())),
		PropertyValue::SInt32(v) => values(v, |n| Scalar::Int(n.into())),
		PropertyValue::SInt64(v) => values(v, Scalar::Int),
		PropertyValue::Float32(v) => values(v, |n| Scalar::Float(n.into())),
		PropertyValue::Bool(v) => values(v, Scalar::Bool),
		PropertyValue::String(s) => ScalarOrVector::Scalar(Scalar::String(s.clone())),
	}
}

/// Value equality as seen through the binary format: one element lists equal their value,
/// and floats are compared by bits so that NaN equals itself.
fn same_value(a: &PropertyValue, b: &PropertyValue) -> bool {
	match (a.clone().normalized(), b.clone().normalized()) {
		(PropertyValue::Float32(a), PropertyValue::Float32(b)) => {
			let a = a.as_slice();
			let b = b.as_slice();
			a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.to_bits() == b.to_bits())
		}
		(a, b) => a == b,
	}
}

/// The changes that turn `original` into `current`, or `None` when there are none.
pub fn diff(current: &ExemplarData, original: &ExemplarData) -> Option<ExemplarPatch> {
	let mut patch = ExemplarPatch::default();
	if current.parent_cohort != original.parent_cohort {
		patch.parent_cohort = Change::Set(current.parent_cohort);
	}
	for (&id, property) in &current.properties {
		let changed = original
			.get(id)
			.map_or(true, |old| !same_value(&property.value, &old.value));
		if changed {
			patch
				.properties
				.insert(id, Change::Set(to_untyped(&property.value)));
		}
	}
	for &id in original.properties.keys() {
		if !current.properties.contains_key(&id) {
			patch.properties.insert(id, Change::Deleted);
		}
	}
	(!patch.is_empty()).then_some(patch)
}

/// Applies `patch` to a copy of `original`.
pub fn apply(
	original: &ExemplarData,
	patch: &ExemplarPatch,
	info: &PropertyInfoTable,
) -> Result<ExemplarData> {
	let mut exemplar = original.clone();
	match patch.parent_cohort {
		Change::Unchanged => {}
		Change::Set(tgi) => exemplar.parent_cohort = tgi,
		Change::Deleted => exemplar.parent_cohort = Tgi::ZERO,
	}
	for (&id, change) in &patch.properties {
		match change {
			Change::Unchanged => {}
			Change::Deleted => {
				exemplar.properties.shift_remove(&id);
			}
			Change::Set(value) => {
				let value_type = exemplar
					.get(id)
					.map(Property::value_type)
					.or_else(|| info.get(&id).map(|info| info.value_type))
					.ok_or(DbpfError::UnknownProperty { id })?;
				let value = coerce(id, value_type, value)?;
				exemplar.insert(Property { id, value });
			}
		}
	}
	Ok(exemplar)
}

fn coerce(id: u32, value_type: PropertyValueType, value: &ScalarOrVector) -> Result<PropertyValue> {
	let mismatch = || DbpfError::TypeMismatch { id, value_type };
	let int = |scalar: &Scalar| match scalar {
		Scalar::Int(n) => Ok(*n),
		_ => Err(mismatch()),
	};
	fn each<T>(
		value: &ScalarOrVector,
		convert: impl Fn(&Scalar) -> Result<T>,
	) -> Result<Values<T>> {
		Ok(match value {
			ScalarOrVector::Scalar(scalar) => Values::Single(convert(scalar)?),
			ScalarOrVector::Vector(scalars) => {
				Values::Multi(scalars.iter().map(convert).collect::<Result<_>>()?)
			}
		})
	}

	Ok(match value_type {
		PropertyValueType::UInt8 => PropertyValue::UInt8(each(value, |s| {
			u8::try_from(int(s)?).map_err(|_| mismatch())
		})?),
		PropertyValueType::UInt16 => PropertyValue::UInt16(each(value, |s| {
			u16::try_from(int(s)?).map_err(|_| mismatch())
		})?),
		PropertyValueType::UInt32 => PropertyValue::UInt32(each(value, |s| {
			u32::try_from(int(s)?).map_err(|_| mismatch())
		})?),
		PropertyValueType::SInt32 => PropertyValue::SInt32(each(value, |s| {
			i32::try_from(int(s)?).map_err(|_| mismatch())
		})?),
		PropertyValueType::SInt64 => PropertyValue::SInt64(each(value, int)?),
		PropertyValueType::Float32 => PropertyValue::Float32(each(value, |s| match s {
			Scalar::Float(f) => Ok(*f as f32),
			Scalar::Int(n) => Ok(*n as f32),
			Scalar::String(token) => non_finite_from_token(token).ok_or_else(mismatch),
			Scalar::Bool(_) => Err(mismatch()),
		})?),
		PropertyValueType::Bool => PropertyValue::Bool(each(value, |s| match s {
			Scalar::Bool(b) => Ok(*b),
			_ => Err(mismatch()),
		})?),
		PropertyValueType::String => match value {
			ScalarOrVector::Scalar(Scalar::String(s)) => PropertyValue::String(s.clone()),
			_ => return Err(mismatch()),
		},
	})
}
