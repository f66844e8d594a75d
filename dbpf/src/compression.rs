// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! QFS (RefPack) framing as stored in SC4 packages.
//!
//! A compressed entry starts with a little-endian u32 size field written by the game, followed by
//! the RefPack stream itself (`0x10FB` magic and a 24-bit big-endian decompressed size).

use log::debug;
use refpack::{
	data::compression::CompressionOptions,
	format::{Maxis, SimEA},
};

use crate::error::{DbpfError, Result};

pub const SIZE_PREFIX_LEN: usize = 4;

/// Decompress a size-prefixed entry payload.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
	if data.len() < SIZE_PREFIX_LEN {
		return Err(DbpfError::CorruptData(format!(
			"compressed payload of {} bytes has no size prefix",
			data.len()
		)));
	}
	let decompressed = refpack::easy_decompress::<Maxis>(data)
		.or_else(|_| refpack::easy_decompress::<SimEA>(&data[SIZE_PREFIX_LEN..]))?;
	debug!(
		"decompressed {} bytes into {}",
		data.len(),
		decompressed.len()
	);
	Ok(decompressed)
}

/// Decompress a bare RefPack stream, one that has had its size prefix stripped.
pub fn decompress_stream(stream: &[u8]) -> Result<Vec<u8>> {
	let mut framed = Vec::with_capacity(stream.len() + SIZE_PREFIX_LEN);
	framed.extend_from_slice(&frame_size(stream.len())?.to_le_bytes());
	framed.extend_from_slice(stream);
	decompress(&framed)
}

/// Compress `data`; with `include_size` the result is ready to be stored as an entry payload,
/// otherwise it is the bare stream without the size prefix.
pub fn compress(data: &[u8], include_size: bool) -> Result<Vec<u8>> {
	let mut compressed = refpack::easy_compress::<Maxis>(data, CompressionOptions::Optimal)?;
	debug!("compressed {} bytes into {}", data.len(), compressed.len());
	if !include_size {
		compressed.drain(..SIZE_PREFIX_LEN);
	}
	Ok(compressed)
}

fn frame_size(stream_len: usize) -> Result<u32> {
	u32::try_from(stream_len + SIZE_PREFIX_LEN)
		.map_err(|_| DbpfError::CorruptData(format!("stream of {stream_len} bytes is too large")))
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use test_strategy::proptest;

	use super::*;

	#[test]
	fn repetitive_data_shrinks() {
		let data = b"EQZB1###".repeat(64);
		let compressed = compress(&data, true).unwrap();
		assert!(compressed.len() < data.len());
		assert_eq!(decompress(&compressed).unwrap(), data);
	}

	#[test]
	fn bare_stream() {
		let data = b"ParentCohort=Key:{0x00000000,0x00000000,0x00000000}\n".repeat(8);
		let stream = compress(&data, false).unwrap();
		assert_eq!(stream.len() + SIZE_PREFIX_LEN, compress(&data, true).unwrap().len());
		assert_eq!(decompress_stream(&stream).unwrap(), data);
	}

	#[test]
	fn garbage_is_corrupt() {
		assert!(matches!(decompress(&[1, 2]), Err(DbpfError::CorruptData(_))));
		assert!(matches!(
			decompress(&[0x10, 0, 0, 0, 0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03]),
			Err(DbpfError::CorruptData(_))
		));
	}

	#[proptest(ProptestConfig { cases: 64, ..ProptestConfig::default() })]
	fn round_trip(#[strategy(proptest::collection::vec(any::<u8>(), 1..2048))] data: Vec<u8>) {
		let compressed = compress(&data, true).unwrap();
		prop_assert_eq!(decompress(&compressed).unwrap(), data);
	}
}
