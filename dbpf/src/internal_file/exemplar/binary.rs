// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::{BinRead, BinWrite};

use crate::{
	buffer::{Encoding, FixedWidth, ReadBuffer, WriteBuffer},
	error::{DbpfError, Result},
	internal_file::exemplar::{
		ExemplarData, KeyType, Property, PropertyValue, PropertyValueType, Values,
		COHORT_BINARY_TAG, EXEMPLAR_BINARY_TAG,
	},
};

// id, value type, key type, reserved
const PROPERTY_HEADER_SIZE: usize = 9;

pub(super) fn decode(buf: &mut ReadBuffer, is_cohort: bool) -> Result<ExemplarData> {
	let parent_cohort = buf.read_tgi(None)?;
	let count = buf.read_u32(None)? as usize;
	if count > buf.remaining() / PROPERTY_HEADER_SIZE {
		return Err(DbpfError::OutOfRange {
			offset: buf.position(),
			size: count.saturating_mul(PROPERTY_HEADER_SIZE),
			len: buf.len(),
		});
	}
	let mut exemplar = ExemplarData::new(is_cohort, parent_cohort);
	for _ in 0..count {
		let property = decode_property(buf)?;
		exemplar.insert(property);
	}
	Ok(exemplar)
}

fn decode_property(buf: &mut ReadBuffer) -> Result<Property> {
	let id = buf.read_u32(None)?;
	let type_code = buf.read_u16(None)?;
	let value_type = PropertyValueType::try_from(type_code).map_err(|_| {
		DbpfError::ProtocolViolation(format!(
			"property {id:#010X} has unknown value type {type_code:#06X}"
		))
	})?;
	let key_code = buf.read_u16(None)?;
	let key_type = KeyType::try_from(key_code).map_err(|_| {
		DbpfError::ProtocolViolation(format!(
			"property {id:#010X} has unknown key type {key_code:#06X}"
		))
	})?;
	let reserved = buf.read_u8(None)?;

	let count = match key_type {
		KeyType::Single => {
			if reserved != 0 {
				return Err(DbpfError::ProtocolViolation(format!(
					"property {id:#010X} has nonzero reserved byte {reserved:#04X}"
				)));
			}
			None
		}
		KeyType::Multi => {
			let count = buf.read_u32(None)? as usize;
			if count > buf.remaining() / value_type.width() {
				return Err(DbpfError::OutOfRange {
					offset: buf.position(),
					size: count.saturating_mul(value_type.width()),
					len: buf.len(),
				});
			}
			Some(count)
		}
	};

	let value = match value_type {
		PropertyValueType::UInt8 => PropertyValue::UInt8(read_values(buf, count)?),
		PropertyValueType::UInt16 => PropertyValue::UInt16(read_values(buf, count)?),
		PropertyValueType::UInt32 => PropertyValue::UInt32(read_values(buf, count)?),
		PropertyValueType::SInt32 => PropertyValue::SInt32(read_values(buf, count)?),
		PropertyValueType::SInt64 => PropertyValue::SInt64(read_values(buf, count)?),
		PropertyValueType::Float32 => PropertyValue::Float32(read_values(buf, count)?),
		PropertyValueType::Bool => PropertyValue::Bool(match count {
			None => Values::Single(buf.read_bool(None)?),
			Some(count) => Values::Multi(
				(0..count)
					.map(|_| buf.read_bool(None))
					.collect::<Result<_>>()?,
			),
		}),
		PropertyValueType::String => {
			let Some(count) = count else {
				return Err(DbpfError::ProtocolViolation(format!(
					"string property {id:#010X} is not stored as a list of characters"
				)));
			};
			PropertyValue::String(buf.read_string(count, Encoding::Latin1, None)?)
		}
	};
	Ok(Property { id, value })
}

fn read_values<T>(buf: &mut ReadBuffer, count: Option<usize>) -> Result<Values<T>>
where
	T: FixedWidth + for<'b> BinRead<Args<'b> = ()>,
{
	Ok(match count {
		None => Values::Single(buf.read(None)?),
		Some(count) => Values::Multi((0..count).map(|_| buf.read(None)).collect::<Result<_>>()?),
	})
}

pub(super) fn encode(exemplar: &ExemplarData) -> Result<Vec<u8>> {
	let mut out = WriteBuffer::new();
	out.write_bytes(
		if exemplar.is_cohort {
			COHORT_BINARY_TAG
		} else {
			EXEMPLAR_BINARY_TAG
		},
		None,
	)?;
	out.write_tgi(exemplar.parent_cohort, None)?;
	out.write_u32(exemplar.properties.len() as u32, None)?;
	for property in exemplar.properties.values() {
		encode_property(&mut out, property)?;
	}
	Ok(out.into_bytes())
}

fn encode_property(out: &mut WriteBuffer, property: &Property) -> Result<()> {
	out.write_u32(property.id, None)?;
	out.write_u16(property.value_type() as u16, None)?;
	match &property.value {
		PropertyValue::UInt8(values) => write_values(out, values),
		PropertyValue::UInt16(values) => write_values(out, values),
		PropertyValue::UInt32(values) => write_values(out, values),
		PropertyValue::SInt32(values) => write_values(out, values),
		PropertyValue::SInt64(values) => write_values(out, values),
		PropertyValue::Float32(values) => write_values(out, values),
		PropertyValue::Bool(values) => {
			let values = values.as_slice();
			write_key(out, values.len())?;
			values.iter().try_for_each(|&value| out.write_bool(value, None))
		}
		PropertyValue::String(str) => {
			let bytes = Encoding::Latin1.encode(str)?;
			write_multi_key(out, bytes.len())?;
			out.write_bytes(&bytes, None)
		}
	}
}

/// A single value goes out as `Single`, since some readers of the game misread one element lists.
fn write_key(out: &mut WriteBuffer, count: usize) -> Result<()> {
	if count == 1 {
		out.write_u16(KeyType::Single as u16, None)?;
		out.write_u8(0, None)
	} else {
		write_multi_key(out, count)
	}
}

fn write_multi_key(out: &mut WriteBuffer, count: usize) -> Result<()> {
	out.write_u16(KeyType::Multi as u16, None)?;
	out.write_u8(0, None)?;
	out.write_u32(count as u32, None)
}

fn write_values<T>(out: &mut WriteBuffer, values: &Values<T>) -> Result<()>
where
	T: FixedWidth + for<'b> BinWrite<Args<'b> = ()>,
{
	let values = values.as_slice();
	write_key(out, values.len())?;
	values.iter().try_for_each(|value| out.write(value, None))
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use test_strategy::proptest;

	use super::*;
	use crate::tgi::Tgi;

	fn single_uint32() -> Vec<u8> {
		let mut bytes = b"EQZB1###".to_vec();
		bytes.extend_from_slice(&[0; 12]);
		bytes.extend_from_slice(&1u32.to_le_bytes());
		bytes.extend_from_slice(&0x10u32.to_le_bytes());
		bytes.extend_from_slice(&0x0300u16.to_le_bytes());
		bytes.extend_from_slice(&0u16.to_le_bytes());
		bytes.push(0);
		bytes.extend_from_slice(&2u32.to_le_bytes());
		bytes
	}

	#[test]
	fn single_value_re_encodes_identically() {
		let bytes = single_uint32();
		let exemplar = ExemplarData::decode(&bytes).unwrap();
		assert!(!exemplar.is_cohort);
		assert!(exemplar.parent_cohort.is_zero());
		assert_eq!(exemplar.get(0x10), Some(&Property::new(0x10, 2u32)));
		assert_eq!(exemplar.encode().unwrap(), bytes);
	}

	#[test]
	fn reserved_byte_must_be_zero() {
		let mut bytes = single_uint32();
		bytes[32] = 1;
		assert!(matches!(
			ExemplarData::decode(&bytes),
			Err(DbpfError::ProtocolViolation(_))
		));
	}

	#[test]
	fn unknown_codes() {
		let mut bytes = single_uint32();
		bytes[28] = 0x04;
		assert!(matches!(
			ExemplarData::decode(&bytes),
			Err(DbpfError::ProtocolViolation(_))
		));

		let mut bytes = single_uint32();
		bytes[30] = 0x40;
		assert!(matches!(
			ExemplarData::decode(&bytes),
			Err(DbpfError::ProtocolViolation(_))
		));

		// a string can only be stored with a character count
		let mut bytes = single_uint32();
		bytes[29] = 0x0C;
		assert!(matches!(
			ExemplarData::decode(&bytes),
			Err(DbpfError::ProtocolViolation(_))
		));
	}

	#[test]
	fn truncated_values() {
		let bytes = single_uint32();
		assert!(matches!(
			ExemplarData::decode(&bytes[..bytes.len() - 1]),
			Err(DbpfError::OutOfRange { .. })
		));

		// claims far more properties than the body can hold
		let mut bytes = single_uint32();
		bytes[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
		assert!(matches!(
			ExemplarData::decode(&bytes),
			Err(DbpfError::OutOfRange { .. })
		));
	}

	#[test]
	fn cohort_with_lists_and_strings() {
		let mut cohort = ExemplarData::new(true, Tgi::new(0x05342861, 0x1, 0x2));
		cohort.insert(Property::new(0x20, "Caf\u{e9}"));
		cohort.insert(Property::new(0x30, vec![1u8, 2, 3]));
		cohort.insert(Property::new(0x40, Vec::<i64>::new()));
		cohort.insert(Property::new(0x50, vec![true]));
		let bytes = cohort.encode().unwrap();
		assert_eq!(&bytes[..8], b"CQZB1###");

		// string: Multi with the character count
		let string_start = 24;
		assert_eq!(
			&bytes[string_start..string_start + 17],
			&[0x20, 0, 0, 0, 0x00, 0x0C, 0x80, 0, 0, 4, 0, 0, 0, b'C', b'a', b'f', 0xE9]
		);

		let decoded = ExemplarData::decode(&bytes).unwrap();
		assert_eq!(decoded, cohort.normalized());
		assert_eq!(
			decoded.get(0x50).unwrap().value,
			PropertyValue::Bool(Values::Single(true))
		);
		assert_eq!(
			decoded.get(0x40).unwrap().value,
			PropertyValue::SInt64(Values::Multi(vec![]))
		);
	}

	#[test]
	fn unencodable_string() {
		let mut exemplar = ExemplarData::default();
		exemplar.insert(Property::new(0x20, "\u{20AC}"));
		assert!(matches!(
			exemplar.encode(),
			Err(DbpfError::UnencodableString('\u{20AC}'))
		));
	}

	fn values<T: Arbitrary + Clone + std::fmt::Debug>() -> impl Strategy<Value = Values<T>> {
		prop_oneof![
			any::<T>().prop_map(Values::Single),
			proptest::collection::vec(any::<T>(), 0..5).prop_map(Values::Multi),
		]
	}

	fn property_value() -> impl Strategy<Value = PropertyValue> {
		prop_oneof![
			values::<u8>().prop_map(PropertyValue::UInt8),
			values::<u16>().prop_map(PropertyValue::UInt16),
			values::<u32>().prop_map(PropertyValue::UInt32),
			values::<i32>().prop_map(PropertyValue::SInt32),
			values::<i64>().prop_map(PropertyValue::SInt64),
			prop_oneof![
				(-1e9f32..1e9f32).prop_map(Values::Single),
				proptest::collection::vec(-1e9f32..1e9f32, 0..5).prop_map(Values::Multi),
			]
			.prop_map(PropertyValue::Float32),
			values::<bool>().prop_map(PropertyValue::Bool),
			"[ -~\u{a0}-\u{ff}]{0,12}".prop_map(PropertyValue::String),
		]
	}

	fn exemplars() -> impl Strategy<Value = ExemplarData> {
		(
			any::<bool>(),
			any::<[u32; 3]>(),
			proptest::collection::vec((any::<u32>(), property_value()), 0..8),
		)
			.prop_map(|(is_cohort, parent, properties)| {
				let mut exemplar = ExemplarData::new(is_cohort, Tgi::from(parent));
				for (id, value) in properties {
					exemplar.insert(Property { id, value });
				}
				exemplar
			})
	}

	#[proptest]
	fn round_trip(#[strategy(exemplars())] exemplar: ExemplarData) {
		let bytes = exemplar.encode().unwrap();
		prop_assert_eq!(ExemplarData::decode(&bytes).unwrap(), exemplar.normalized());
	}
}
