// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bounds-checked little-endian cursors over in-memory bytes.
//!
//! Every accessor takes an optional offset: `None` reads or writes at the cursor and advances it,
//! `Some(offset)` accesses that position and leaves the cursor where it was.

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::{
	compression,
	error::{DbpfError, Result},
	tgi::Tgi,
};

/// Types with a constant encoded size, readable through [`ReadBuffer::read`].
pub trait FixedWidth {
	const WIDTH: usize;
}

macro_rules! fixed_width {
    ($($t:ty),*) => {
        $(
            impl FixedWidth for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();
            }
        )*
    };
}

fixed_width!(u8, u16, u32, u64, i8, i16, i32, i64, f32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Encoding {
	Ascii,
	/// One byte per character, every byte sequence is valid
	#[default]
	Latin1,
	Utf8,
}

impl Encoding {
	pub fn decode(self, bytes: &[u8]) -> Result<String> {
		match self {
			Encoding::Ascii => {
				if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
					return Err(DbpfError::ProtocolViolation(format!(
						"non-ascii byte {:#04x} in string at position {pos}",
						bytes[pos]
					)));
				}
				Ok(bytes.iter().map(|&b| b as char).collect())
			}
			Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
			Encoding::Utf8 => String::from_utf8(bytes.to_vec())
				.map_err(|err| DbpfError::ProtocolViolation(err.to_string())),
		}
	}

	pub fn encode(self, str: &str) -> Result<Vec<u8>> {
		match self {
			Encoding::Ascii => str
				.chars()
				.map(|c| {
					c.is_ascii()
						.then_some(c as u8)
						.ok_or(DbpfError::UnencodableString(c))
				})
				.collect(),
			Encoding::Latin1 => str
				.chars()
				.map(|c| u8::try_from(u32::from(c)).map_err(|_| DbpfError::UnencodableString(c)))
				.collect(),
			Encoding::Utf8 => Ok(str.as_bytes().to_vec()),
		}
	}
}

/// Smallest power of two that can hold `required` bytes.
pub fn next_capacity(required: usize) -> usize {
	required
		.checked_next_power_of_two()
		.unwrap_or(usize::MAX)
}

#[derive(Clone, Debug)]
pub struct ReadBuffer<'a> {
	data: &'a [u8],
	position: usize,
}

impl<'a> ReadBuffer<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, position: 0 }
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn remaining(&self) -> usize {
		self.data.len().saturating_sub(self.position)
	}

	pub fn seek(&mut self, position: usize) -> Result<()> {
		if position > self.data.len() {
			return Err(DbpfError::OutOfRange {
				offset: position,
				size: 0,
				len: self.data.len(),
			});
		}
		self.position = position;
		Ok(())
	}

	fn span(&self, offset: Option<usize>, size: usize) -> Result<&'a [u8]> {
		let data: &'a [u8] = self.data;
		let start = offset.unwrap_or(self.position);
		start
			.checked_add(size)
			.filter(|&end| end <= data.len())
			.map(|end| &data[start..end])
			.ok_or(DbpfError::OutOfRange {
				offset: start,
				size,
				len: data.len(),
			})
	}

	fn advance(&mut self, offset: Option<usize>, size: usize) {
		if offset.is_none() {
			self.position += size;
		}
	}

	/// Reads any fixed width record, decoding it as little endian.
	pub fn read<T>(&mut self, offset: Option<usize>) -> Result<T>
	where
		T: FixedWidth + for<'b> BinRead<Args<'b> = ()>,
	{
		let bytes = self.span(offset, T::WIDTH)?;
		let value = T::read_le(&mut Cursor::new(bytes))?;
		self.advance(offset, T::WIDTH);
		Ok(value)
	}

	pub fn read_u8(&mut self, offset: Option<usize>) -> Result<u8> {
		self.read(offset)
	}

	pub fn read_u16(&mut self, offset: Option<usize>) -> Result<u16> {
		self.read(offset)
	}

	pub fn read_u32(&mut self, offset: Option<usize>) -> Result<u32> {
		self.read(offset)
	}

	pub fn read_i8(&mut self, offset: Option<usize>) -> Result<i8> {
		self.read(offset)
	}

	pub fn read_i16(&mut self, offset: Option<usize>) -> Result<i16> {
		self.read(offset)
	}

	pub fn read_i32(&mut self, offset: Option<usize>) -> Result<i32> {
		self.read(offset)
	}

	pub fn read_i64(&mut self, offset: Option<usize>) -> Result<i64> {
		self.read(offset)
	}

	pub fn read_f32(&mut self, offset: Option<usize>) -> Result<f32> {
		self.read(offset)
	}

	pub fn read_bool(&mut self, offset: Option<usize>) -> Result<bool> {
		self.read_u8(offset).map(|b| b > 0)
	}

	pub fn read_tgi(&mut self, offset: Option<usize>) -> Result<Tgi> {
		self.read(offset)
	}

	pub fn read_bytes(&mut self, count: usize, offset: Option<usize>) -> Result<&'a [u8]> {
		let bytes = self.span(offset, count)?;
		self.advance(offset, count);
		Ok(bytes)
	}

	pub fn read_string(
		&mut self,
		count: usize,
		encoding: Encoding,
		offset: Option<usize>,
	) -> Result<String> {
		let bytes = self.span(offset, count)?;
		let str = encoding.decode(bytes)?;
		self.advance(offset, count);
		Ok(str)
	}
}

/// Growable (or fixed size) little-endian writer.
///
/// The backing storage grows to [`next_capacity`] of the furthest write, while [`len`](Self::len)
/// only counts the bytes that were actually written.
#[derive(Clone, Debug, Default)]
pub struct WriteBuffer {
	data: Vec<u8>,
	len: usize,
	position: usize,
	fixed: bool,
	compressed: bool,
}

impl WriteBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			data: vec![0; next_capacity(capacity)],
			..Self::default()
		}
	}

	/// A writer that fails instead of growing past `size` bytes.
	pub fn fixed(size: usize) -> Self {
		Self {
			data: vec![0; size],
			fixed: true,
			..Self::default()
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn capacity(&self) -> usize {
		self.data.len()
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn is_compressed(&self) -> bool {
		self.compressed
	}

	pub fn seek(&mut self, position: usize) -> Result<()> {
		if self.compressed {
			return Err(DbpfError::AlreadyCompressed);
		}
		if self.fixed && position > self.data.len() {
			return Err(DbpfError::OutOfRange {
				offset: position,
				size: 0,
				len: self.data.len(),
			});
		}
		self.position = position;
		Ok(())
	}

	fn reserve(&mut self, offset: Option<usize>, size: usize) -> Result<(usize, usize)> {
		if self.compressed {
			return Err(DbpfError::AlreadyCompressed);
		}
		let start = offset.unwrap_or(self.position);
		let out_of_range = DbpfError::OutOfRange {
			offset: start,
			size,
			len: self.data.len(),
		};
		let end = start.checked_add(size).ok_or(out_of_range)?;
		if end > self.data.len() {
			if self.fixed {
				return Err(DbpfError::OutOfRange {
					offset: start,
					size,
					len: self.data.len(),
				});
			}
			self.data.resize(next_capacity(end), 0);
		}
		Ok((start, end))
	}

	fn commit(&mut self, offset: Option<usize>, end: usize) {
		self.len = self.len.max(end);
		if offset.is_none() {
			self.position = end;
		}
	}

	pub fn write<T>(&mut self, value: &T, offset: Option<usize>) -> Result<()>
	where
		T: FixedWidth + for<'b> BinWrite<Args<'b> = ()>,
	{
		let (start, end) = self.reserve(offset, T::WIDTH)?;
		value.write_le(&mut Cursor::new(&mut self.data[start..end]))?;
		self.commit(offset, end);
		Ok(())
	}

	pub fn write_u8(&mut self, value: u8, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_u16(&mut self, value: u16, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_u32(&mut self, value: u32, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_i8(&mut self, value: i8, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_i16(&mut self, value: i16, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_i32(&mut self, value: i32, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_i64(&mut self, value: i64, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_f32(&mut self, value: f32, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_bool(&mut self, value: bool, offset: Option<usize>) -> Result<()> {
		self.write_u8(value as u8, offset)
	}

	pub fn write_tgi(&mut self, value: Tgi, offset: Option<usize>) -> Result<()> {
		self.write(&value, offset)
	}

	pub fn write_bytes(&mut self, bytes: &[u8], offset: Option<usize>) -> Result<()> {
		let (start, end) = self.reserve(offset, bytes.len())?;
		self.data[start..end].copy_from_slice(bytes);
		self.commit(offset, end);
		Ok(())
	}

	/// Writes the encoded string without any length prefix, returning the number of bytes written.
	pub fn write_string(
		&mut self,
		str: &str,
		encoding: Encoding,
		offset: Option<usize>,
	) -> Result<usize> {
		let bytes = encoding.encode(str)?;
		self.write_bytes(&bytes, offset)?;
		Ok(bytes.len())
	}

	/// Replaces the written bytes by their size-prefixed QFS compression.
	/// The buffer can not be written to afterwards.
	pub fn compress(&mut self) -> Result<()> {
		if self.compressed {
			return Err(DbpfError::AlreadyCompressed);
		}
		self.data = compression::compress(&self.data[..self.len], true)?;
		self.len = self.data.len();
		self.position = self.len;
		self.compressed = true;
		Ok(())
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.data[..self.len]
	}

	pub fn into_bytes(mut self) -> Vec<u8> {
		self.data.truncate(self.len);
		self.data
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use test_strategy::proptest;

	use super::*;

	#[test]
	fn cursor_and_random_access() {
		let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
		let mut buf = ReadBuffer::new(&data);
		assert_eq!(buf.read_u16(None).unwrap(), 0x0201);
		assert_eq!(buf.position(), 2);
		assert_eq!(buf.read_u32(Some(4)).unwrap(), u32::MAX);
		assert_eq!(buf.read_i32(Some(4)).unwrap(), -1);
		assert_eq!(buf.position(), 2);
		assert_eq!(buf.read_u8(None).unwrap(), 3);
		assert!(buf.read_bool(None).unwrap());
		assert_eq!(buf.read_bytes(4, None).unwrap(), &[0xFF; 4]);
		assert_eq!(buf.remaining(), 0);
	}

	#[test]
	fn out_of_range_does_not_advance() {
		let data = [1, 2, 3];
		let mut buf = ReadBuffer::new(&data);
		buf.read_u8(None).unwrap();
		assert!(matches!(
			buf.read_u32(None),
			Err(DbpfError::OutOfRange {
				offset: 1,
				size: 4,
				len: 3
			})
		));
		assert_eq!(buf.position(), 1);
		assert!(matches!(
			buf.read_bytes(1, Some(usize::MAX)),
			Err(DbpfError::OutOfRange { .. })
		));
		assert!(buf.seek(4).is_err());
	}

	#[test]
	fn strings() {
		let data = b"Caf\xe9";
		let mut buf = ReadBuffer::new(data);
		assert_eq!(buf.read_string(4, Encoding::Latin1, Some(0)).unwrap(), "Café");
		assert!(matches!(
			buf.read_string(4, Encoding::Ascii, Some(0)),
			Err(DbpfError::ProtocolViolation(_))
		));
		assert!(buf.read_string(4, Encoding::Utf8, Some(0)).is_err());
		assert_eq!(buf.read_string(3, Encoding::Utf8, None).unwrap(), "Caf");

		let mut out = WriteBuffer::new();
		assert_eq!(out.write_string("Café", Encoding::Latin1, None).unwrap(), 4);
		assert_eq!(out.as_bytes(), data);
		assert!(matches!(
			out.write_string("€", Encoding::Latin1, None),
			Err(DbpfError::UnencodableString('€'))
		));
	}

	#[test]
	fn capacity_is_next_power_of_two() {
		assert_eq!(next_capacity(1), 1);
		assert_eq!(next_capacity(3), 4);
		assert_eq!(next_capacity(64), 64);
		assert_eq!(next_capacity(65), 128);

		let mut buf = WriteBuffer::new();
		buf.write_u32(7, None).unwrap();
		buf.write_u8(1, None).unwrap();
		assert_eq!(buf.len(), 5);
		assert_eq!(buf.capacity(), 8);
		buf.write_tgi(Tgi::new(1, 2, 3), None).unwrap();
		assert_eq!(buf.len(), 17);
		assert_eq!(buf.capacity(), 32);
		assert_eq!(buf.into_bytes().len(), 17);
	}

	#[test]
	fn random_access_write_keeps_cursor() {
		let mut buf = WriteBuffer::new();
		buf.write_u32(0, None).unwrap();
		buf.write_u16(0xBEEF, Some(10)).unwrap();
		assert_eq!(buf.position(), 4);
		assert_eq!(buf.len(), 12);
		buf.write_u32(0xAABBCCDD, Some(0)).unwrap();
		assert_eq!(
			buf.as_bytes(),
			&[0xDD, 0xCC, 0xBB, 0xAA, 0, 0, 0, 0, 0, 0, 0xEF, 0xBE]
		);
	}

	#[test]
	fn fixed_buffer_does_not_grow() {
		let mut buf = WriteBuffer::fixed(6);
		buf.write_u32(1, None).unwrap();
		assert!(matches!(
			buf.write_u32(2, None),
			Err(DbpfError::OutOfRange { offset: 4, .. })
		));
		buf.write_u16(2, None).unwrap();
		assert_eq!(buf.as_bytes(), &[1, 0, 0, 0, 2, 0]);
	}

	#[test]
	fn compressed_buffer_rejects_writes() {
		let mut buf = WriteBuffer::new();
		buf.write_bytes(&[b'a'; 64], None).unwrap();
		buf.compress().unwrap();
		assert!(buf.is_compressed());
		assert!(matches!(
			buf.write_u8(0, None),
			Err(DbpfError::AlreadyCompressed)
		));
		assert!(matches!(buf.compress(), Err(DbpfError::AlreadyCompressed)));
		assert_eq!(
			compression::decompress(buf.as_bytes()).unwrap(),
			vec![b'a'; 64]
		);
	}

	#[proptest]
	fn reads_never_pass_the_end(
		#[strategy(proptest::collection::vec(any::<u8>(), 0..32))] data: Vec<u8>,
		#[strategy(0usize..40)] offset: usize,
	) {
		let mut buf = ReadBuffer::new(&data);
		let fits = |width: usize| offset + width <= data.len();
		prop_assert_eq!(buf.read_u8(Some(offset)).is_ok(), fits(1));
		prop_assert_eq!(buf.read_u16(Some(offset)).is_ok(), fits(2));
		prop_assert_eq!(buf.read_f32(Some(offset)).is_ok(), fits(4));
		prop_assert_eq!(buf.read_i64(Some(offset)).is_ok(), fits(8));
		prop_assert_eq!(buf.read_tgi(Some(offset)).is_ok(), fits(12));
		if !fits(8) {
			let is_out_of_range = matches!(
				buf.read_i64(Some(offset)),
				Err(DbpfError::OutOfRange { .. })
			);
			prop_assert!(is_out_of_range);
		}
		prop_assert_eq!(buf.position(), 0);
	}

	#[proptest]
	fn writes_read_back(a: u32, b: i64, c: i16, #[strategy(-1e30f32..1e30f32)] d: f32, e: bool) {
		let mut out = WriteBuffer::new();
		out.write_u32(a, None).unwrap();
		out.write_i64(b, None).unwrap();
		out.write_i16(c, None).unwrap();
		out.write_f32(d, None).unwrap();
		out.write_bool(e, None).unwrap();
		prop_assert_eq!(out.len(), 19);
		prop_assert!(out.capacity() >= out.len());

		let bytes = out.into_bytes();
		let mut buf = ReadBuffer::new(&bytes);
		prop_assert_eq!(buf.read_u32(None).unwrap(), a);
		prop_assert_eq!(buf.read_i64(None).unwrap(), b);
		prop_assert_eq!(buf.read_i16(None).unwrap(), c);
		prop_assert_eq!(buf.read_f32(None).unwrap(), d);
		prop_assert_eq!(buf.read_bool(None).unwrap(), e);
	}
}
