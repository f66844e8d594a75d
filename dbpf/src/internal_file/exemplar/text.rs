// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The plain text exemplar format, as written by the older modding tools:
//!
//! ```text
//! EQZT1###
//! ParentCohort=Key:{0x00000000,0x00000000,0x00000000}
//! PropCount=0x00000002
//! 0x00000010:{"Exemplar Type"}=Uint32:0:{0x00000002}
//! 0x00000020:{"Exemplar Name"}=String:4:{"Park"}
//! ```

use std::{fmt::Write, num::IntErrorKind, str::FromStr};

use itertools::Itertools;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::{
	buffer::{Encoding, ReadBuffer},
	error::{DbpfError, Result},
	internal_file::exemplar::{
		ExemplarData, Property, PropertyInfoTable, PropertyValue, PropertyValueType, Values,
		COHORT_TEXT_TAG, EXEMPLAR_TEXT_TAG,
	},
	tgi::Tgi,
};

lazy_static! {
	static ref PARENT_COHORT: Regex = Regex::new(
		r"^ParentCohort\s*=\s*Key:\s*\{\s*0x([0-9A-Fa-f]{1,8})\s*,\s*0x([0-9A-Fa-f]{1,8})\s*,\s*0x([0-9A-Fa-f]{1,8})\s*\}"
	)
	.unwrap();
	static ref PROPERTY: Regex = Regex::new(
		r#"^0x([0-9A-Fa-f]{1,8})\s*:\s*\{"(.*?)"\}\s*=\s*(\w+)\s*:\s*(\d+)\s*:\s*\{(.*)\}\s*$"#
	)
	.unwrap();
	static ref INT: Regex = Regex::new(r"(?i)int").unwrap();
}

impl PropertyValueType {
	/// Parses a type token of the text format, which spells the integer kinds `Uint32`, `Sint64` etc.
	pub fn from_text_token(token: &str) -> Option<Self> {
		let normalized = INT.replace_all(token, "Int");
		enum_iterator::all::<PropertyValueType>().find(|t| t.to_string() == normalized)
	}

	pub fn text_token(self) -> &'static str {
		match self {
			PropertyValueType::UInt8 => "Uint8",
			PropertyValueType::UInt16 => "Uint16",
			PropertyValueType::UInt32 => "Uint32",
			PropertyValueType::SInt32 => "Sint32",
			PropertyValueType::SInt64 => "Sint64",
			PropertyValueType::Float32 => "Float32",
			PropertyValueType::Bool => "Bool",
			PropertyValueType::String => "String",
		}
	}
}

pub(super) fn decode(buf: &mut ReadBuffer, is_cohort: bool) -> Result<ExemplarData> {
	let text = buf.read_string(buf.remaining(), Encoding::Utf8, None)?;
	let mut exemplar = ExemplarData::new(is_cohort, Tgi::ZERO);
	for line in text.lines().map(str::trim) {
		if let Some(captures) = PARENT_COHORT.captures(line) {
			exemplar.parent_cohort = Tgi::new(
				parse_hex_u32(&captures[1])?,
				parse_hex_u32(&captures[2])?,
				parse_hex_u32(&captures[3])?,
			);
		} else if let Some(captures) = PROPERTY.captures(line) {
			let id = parse_hex_u32(&captures[1])?;
			let token = &captures[3];
			let value_type = PropertyValueType::from_text_token(token).ok_or_else(|| {
				DbpfError::ProtocolViolation(format!(
					"property {id:#010X} has unknown type {token:?}"
				))
			})?;
			let count = captures[4]
				.parse::<usize>()
				.map_err(|err| DbpfError::ProtocolViolation(format!("bad count: {err}")))?;
			let value = parse_value(id, value_type, count, &captures[5])?;
			exemplar.insert(Property { id, value });
		} else if !line.is_empty() {
			trace!("skipping exemplar line {line:?}");
		}
	}
	Ok(exemplar)
}

fn parse_hex_u32(digits: &str) -> Result<u32> {
	u32::from_str_radix(digits, 16)
		.map_err(|err| DbpfError::ProtocolViolation(format!("bad hex number {digits:?}: {err}")))
}

fn parse_value(id: u32, value_type: PropertyValueType, count: usize, body: &str) -> Result<PropertyValue> {
	Ok(match value_type {
		PropertyValueType::UInt8 => PropertyValue::UInt8(parse_values(count, body, |s| parse_int(s, u8::try_from))?),
		PropertyValueType::UInt16 => PropertyValue::UInt16(parse_values(count, body, |s| parse_int(s, u16::try_from))?),
		PropertyValueType::UInt32 => PropertyValue::UInt32(parse_values(count, body, |s| parse_int(s, u32::try_from))?),
		PropertyValueType::SInt32 => PropertyValue::SInt32(parse_values(count, body, |s| {
			parse_int(s, |n| i32::try_from(n).or_else(|_| u32::try_from(n).map(|bits| bits as i32)))
		})?),
		PropertyValueType::SInt64 => PropertyValue::SInt64(parse_values(count, body, |s| {
			parse_int(s, |n| i64::try_from(n).or_else(|_| u64::try_from(n).map(|bits| bits as i64)))
		})?),
		PropertyValueType::Float32 => PropertyValue::Float32(parse_values(count, body, |s| {
			f32::from_str(s).map_err(|err| DbpfError::ProtocolViolation(format!("bad float {s:?}: {err}")))
		})?),
		PropertyValueType::Bool => return Err(DbpfError::UnsupportedTextBoolean { id }),
		PropertyValueType::String => {
			let body = body.trim();
			let body = body.strip_prefix('"').unwrap_or(body);
			let body = body.strip_suffix('"').unwrap_or(body);
			PropertyValue::String(body.to_string())
		}
	})
}

/// A count of 0 marks a single value, anything else a list.
fn parse_values<T>(count: usize, body: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Values<T>> {
	let items = body
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(parse)
		.collect::<Result<Vec<_>>>()?;
	if count == 0 && items.len() == 1 {
		return Ok(Values::Single(items.into_iter().next().ok_or_else(|| {
			DbpfError::ProtocolViolation("missing value".to_string())
		})?));
	}
	Ok(Values::Multi(items))
}

/// Integers are `0x` prefixed hex or decimal. Hex is read as a bit pattern, so `0xFFFFFFFF` is a
/// valid Sint32 of -1.
fn parse_int<T, E>(s: &str, convert: impl Fn(i128) -> std::result::Result<T, E>) -> Result<T> {
	let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => i128::from_str_radix(hex, 16),
		None => s.parse::<i128>(),
	};
	let n = parsed.map_err(|err| {
		DbpfError::ProtocolViolation(match err.kind() {
			IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => format!("number {s:?} is too large"),
			_ => format!("bad number {s:?}: {err}"),
		})
	})?;
	convert(n).map_err(|_| DbpfError::ProtocolViolation(format!("number {s:?} is out of range")))
}

pub(super) fn encode(exemplar: &ExemplarData, info: Option<&PropertyInfoTable>) -> Result<String> {
	let mut out = String::new();
	let tag = if exemplar.is_cohort {
		COHORT_TEXT_TAG
	} else {
		EXEMPLAR_TEXT_TAG
	};
	out.push_str(&String::from_utf8_lossy(tag));
	let Tgi {
		type_id,
		group_id,
		instance_id,
	} = exemplar.parent_cohort;
	write_line(
		&mut out,
		format_args!("ParentCohort=Key:{{0x{type_id:08X},0x{group_id:08X},0x{instance_id:08X}}}"),
	);
	write_line(&mut out, format_args!("PropCount=0x{:08X}", exemplar.properties.len()));
	for property in exemplar.properties.values() {
		let name = info
			.and_then(|info| info.get(&property.id))
			.map(|info| info.name.as_str())
			.unwrap_or_default();
		single_line(property.id, "name", name)?;
		let (count, body) = format_value(property)?;
		write_line(
			&mut out,
			format_args!(
				"0x{:08X}:{{\"{name}\"}}={}:{count}:{{{body}}}",
				property.id,
				property.value_type().text_token()
			),
		);
	}
	Ok(out)
}

fn write_line(out: &mut String, line: std::fmt::Arguments) {
	out.push_str("\r\n");
	// writing to a String does not fail
	let _ = out.write_fmt(line);
}

fn format_value(property: &Property) -> Result<(usize, String)> {
	Ok(match &property.value {
		PropertyValue::UInt8(values) => format_values(values, |v| format!("0x{v:02X}")),
		PropertyValue::UInt16(values) => format_values(values, |v| format!("0x{v:04X}")),
		PropertyValue::UInt32(values) => format_values(values, |v| format!("0x{v:08X}")),
		PropertyValue::SInt32(values) => format_values(values, |v| format!("0x{:08X}", *v as u32)),
		PropertyValue::SInt64(values) => format_values(values, |v| format!("0x{:016X}", *v as u64)),
		PropertyValue::Float32(values) => format_values(values, |v| v.to_string()),
		PropertyValue::Bool(_) => return Err(DbpfError::UnsupportedTextBoolean { id: property.id }),
		PropertyValue::String(str) => {
			single_line(property.id, "value", str)?;
			(str.chars().count(), format!("\"{str}\""))
		}
	})
}

/// Every property is one line of text, a line break would end it early.
fn single_line(id: u32, what: &str, text: &str) -> Result<()> {
	if text.contains(['\r', '\n']) {
		return Err(DbpfError::ProtocolViolation(format!(
			"{what} of property 0x{id:08X} contains a line break"
		)));
	}
	Ok(())
}

fn format_values<T>(values: &Values<T>, format: impl Fn(&T) -> String) -> (usize, String) {
	let count = match values {
		Values::Single(_) => 0,
		Values::Multi(values) => values.len(),
	};
	let body = values.as_slice().iter().map(format).join(",");
	(count, body)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::internal_file::exemplar::PropertyInfo;

	const PARK: &str = "EQZT1###\r\n\
		ParentCohort=Key:{0x05342861,0x0FF0A51A,0x6534284A}\r\n\
		PropCount=0x00000005\r\n\
		0x00000010:{\"Exemplar Type\"}=Uint32:0:{0x00000010}\r\n\
		0x00000020:{\"Exemplar Name\"}=String:1:{\"Park, small\"}\r\n\
		0x27812810:{\"Occupant Size\"}=Float32:3:{16,8.5,-16}\r\n\
		0x88EDC790:{\"Item Order\"}=Sint32:0:{0xFFFFFFFF}\r\n\
		0x8A4ABC81:{\"Budget Item Cost\"}=SINT64:2:{-250,0x10}\r\n";

	#[test]
	fn decode_park() {
		let park = ExemplarData::decode(PARK.as_bytes()).unwrap();
		assert!(!park.is_cohort);
		assert_eq!(park.parent_cohort, Tgi::new(0x05342861, 0x0FF0A51A, 0x6534284A));

		let mut expected = ExemplarData::new(false, park.parent_cohort);
		expected.insert(Property::new(0x10, 0x10u32));
		expected.insert(Property::new(0x20, "Park, small"));
		expected.insert(Property::new(0x27812810, vec![16.0f32, 8.5, -16.0]));
		expected.insert(Property::new(0x88EDC790, -1i32));
		expected.insert(Property::new(0x8A4ABC81, vec![-250i64, 16]));
		assert_eq!(park, expected);
	}

	#[test]
	fn cohort_and_unknown_lines() {
		let text = "CQZT1###\n\n; a comment\n0x00000021:{\"\"}=Uint8:2:{1,0x02}\nnot a property\n";
		let cohort = ExemplarData::decode(text.as_bytes()).unwrap();
		assert!(cohort.is_cohort);
		assert!(cohort.parent_cohort.is_zero());
		assert_eq!(cohort.get(0x21), Some(&Property::new(0x21, vec![1u8, 2])));
		assert_eq!(cohort.properties.len(), 1);
	}

	#[test]
	fn booleans_are_not_supported() {
		let text = "EQZT1###\n0xE91A0B5F:{\"Builds Bridges\"}=Bool:0:{True}\n";
		assert!(matches!(
			ExemplarData::decode(text.as_bytes()),
			Err(DbpfError::UnsupportedTextBoolean { id: 0xE91A0B5F })
		));

		let mut exemplar = ExemplarData::default();
		exemplar.insert(Property::new(0xE91A0B5F, true));
		assert!(matches!(
			exemplar.to_text(None),
			Err(DbpfError::UnsupportedTextBoolean { id: 0xE91A0B5F })
		));
	}

	#[test]
	fn bad_numbers() {
		for line in [
			"0x00000010:{\"\"}=Uint32:0:{0xZZ}",
			"0x00000010:{\"\"}=Uint8:0:{256}",
			"0x00000010:{\"\"}=Uint16:0:{-1}",
			"0x00000010:{\"\"}=Float32:0:{one}",
			"0x00000010:{\"\"}=Number:0:{1}",
		] {
			let text = format!("EQZT1###\n{line}\n");
			assert!(
				matches!(
					ExemplarData::decode(text.as_bytes()),
					Err(DbpfError::ProtocolViolation(_))
				),
				"{line}"
			);
		}
	}

	#[test]
	fn type_tokens() {
		assert_eq!(PropertyValueType::from_text_token("Uint32"), Some(PropertyValueType::UInt32));
		assert_eq!(PropertyValueType::from_text_token("SINT64"), Some(PropertyValueType::SInt64));
		assert_eq!(PropertyValueType::from_text_token("Float32"), Some(PropertyValueType::Float32));
		assert_eq!(PropertyValueType::from_text_token("String"), Some(PropertyValueType::String));
		assert_eq!(PropertyValueType::from_text_token("float32"), None);
		for value_type in enum_iterator::all::<PropertyValueType>() {
			assert_eq!(PropertyValueType::from_text_token(value_type.text_token()), Some(value_type));
		}
	}

	#[test]
	fn render_and_read_back() {
		let park = ExemplarData::decode(PARK.as_bytes()).unwrap();
		let info = PropertyInfoTable::from([
			(0x10, PropertyInfo {
				name: "Exemplar Type".to_string(),
				value_type: PropertyValueType::UInt32,
			}),
			(0x20, PropertyInfo {
				name: "Exemplar Name".to_string(),
				value_type: PropertyValueType::String,
			}),
		]);
		let text = park.to_text(Some(&info)).unwrap();
		assert!(text.starts_with("EQZT1###\r\nParentCohort=Key:{0x05342861,0x0FF0A51A,0x6534284A}\r\nPropCount=0x00000005\r\n"));
		assert!(text.contains("0x00000010:{\"Exemplar Type\"}=Uint32:0:{0x00000010}"));
		assert!(text.contains("0x00000020:{\"Exemplar Name\"}=String:11:{\"Park, small\"}"));
		assert!(text.contains("0x88EDC790:{\"\"}=Sint32:0:{0xFFFFFFFF}"));
		assert_eq!(ExemplarData::decode(text.as_bytes()).unwrap(), park);

		let mut lists = ExemplarData::new(true, Tgi::ZERO);
		lists.insert(Property::new(0x1, vec![7u16]));
		lists.insert(Property::new(0x2, Vec::<u32>::new()));
		lists.insert(Property::new(0x3, "with \"quotes\" and {braces}"));
		lists.insert(Property::new(0x4, f32::MIN_POSITIVE));
		let text = lists.to_text(None).unwrap();
		assert_eq!(ExemplarData::decode(text.as_bytes()).unwrap(), lists);
	}

	#[test]
	fn line_breaks_are_not_rendered() {
		let mut exemplar = ExemplarData::default();
		exemplar.insert(Property::new(0x20, "line one\nline two"));
		assert!(matches!(exemplar.to_text(None), Err(DbpfError::ProtocolViolation(_))));

		let mut exemplar = ExemplarData::default();
		exemplar.insert(Property::new(0x20, "carriage\rreturn"));
		assert!(matches!(exemplar.to_text(None), Err(DbpfError::ProtocolViolation(_))));

		let mut exemplar = ExemplarData::default();
		exemplar.insert(Property::new(0x10, 1u32));
		let info = PropertyInfoTable::from([(0x10, PropertyInfo {
			name: "Two\nLines".to_string(),
			value_type: PropertyValueType::UInt32,
		})]);
		assert!(matches!(exemplar.to_text(Some(&info)), Err(DbpfError::ProtocolViolation(_))));
		assert!(exemplar.to_text(None).is_ok());
	}
}
