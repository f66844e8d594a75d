// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::binrw;
use chrono::{DateTime, Utc};

use crate::{
	buffer::FixedWidth,
	error::{DbpfError, Result},
	tgi::Tgi,
};

pub const HEADER_SIZE: usize = 0x60;
pub const MAGIC: [u8; 4] = *b"DBPF";
pub const INDEX_ENTRY_MIN_SIZE: usize = 20;
pub const DIRECTORY_ENTRY_SIZE: usize = 16;

#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct UserVersion {
	pub major: u32,
	pub minor: u32,
}

/// Seconds since the unix epoch
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Timestamp(pub u32);

impl Timestamp {
	pub fn to_datetime(self) -> DateTime<Utc> {
		DateTime::from_timestamp(self.0 as i64, 0).unwrap_or_default()
	}
}

#[binrw]
#[brw(little)]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DbpfHeader {
	pub magic: [u8; 4],
	pub major_version: u32,
	pub minor_version: u32,
	pub user_version: UserVersion,
	pub flags: u32,
	pub created: Timestamp,
	pub modified: Timestamp,
	pub index_major_version: u32,
	pub index_entry_count: u32,
	pub index_offset: u32,
	pub index_size: u32,
	pub hole_index_entry_count: u32,
	pub hole_index_offset: u32,
	pub hole_index_size: u32,
	pub index_minor_version: u32,
	pub reserved: [u8; 32],
}

impl FixedWidth for DbpfHeader {
	const WIDTH: usize = HEADER_SIZE;
}

impl Default for DbpfHeader {
	fn default() -> Self {
		Self {
			magic: MAGIC,
			major_version: 1,
			minor_version: 0,
			user_version: UserVersion::default(),
			flags: 0,
			created: Timestamp::default(),
			modified: Timestamp::default(),
			index_major_version: 7,
			index_entry_count: 0,
			index_offset: HEADER_SIZE as u32,
			index_size: 0,
			hole_index_entry_count: 0,
			hole_index_offset: 0,
			hole_index_size: 0,
			index_minor_version: 0,
			reserved: [0; 32],
		}
	}
}

impl DbpfHeader {
	/// Only version 1.0 packages with a 7.0 index are supported.
	pub fn validate(&self) -> Result<()> {
		if self.magic != MAGIC {
			return Err(DbpfError::InvalidMagic { found: self.magic });
		}
		if (self.major_version, self.minor_version) != (1, 0) {
			return Err(DbpfError::UnsupportedVersion {
				field: "package",
				major: self.major_version,
				minor: self.minor_version,
			});
		}
		if (self.index_major_version, self.index_minor_version) != (7, 0) {
			return Err(DbpfError::UnsupportedVersion {
				field: "index",
				major: self.index_major_version,
				minor: self.index_minor_version,
			});
		}
		Ok(())
	}

	/// Size of a single index record; trailing bytes past the first 20 are not interpreted.
	pub fn index_entry_size(&self) -> Result<usize> {
		let count = self.index_entry_count as usize;
		let size = self.index_size as usize;
		if count == 0 {
			return Ok(INDEX_ENTRY_MIN_SIZE);
		}
		if size % count != 0 {
			return Err(DbpfError::Malformed(format!(
				"index of {size} bytes does not divide into {count} entries"
			)));
		}
		let entry_size = size / count;
		if entry_size < INDEX_ENTRY_MIN_SIZE {
			return Err(DbpfError::Malformed(format!(
				"index entries of {entry_size} bytes are too small"
			)));
		}
		Ok(entry_size)
	}
}

#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct IndexEntry {
	pub tgi: Tgi,
	pub location: u32,
	pub size: u32,
}

impl FixedWidth for IndexEntry {
	const WIDTH: usize = INDEX_ENTRY_MIN_SIZE;
}

#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DirectoryEntry {
	pub tgi: Tgi,
	pub decompressed_size: u32,
}

impl FixedWidth for DirectoryEntry {
	const WIDTH: usize = DIRECTORY_ENTRY_SIZE;
}
