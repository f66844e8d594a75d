// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use refpack::RefPackError;
use thiserror::Error;

use crate::{internal_file::exemplar::PropertyValueType, tgi::Tgi};

#[derive(Error, Debug)]
pub enum DbpfError {
	#[error("bad magic {found:?}, expected \"DBPF\"")]
	InvalidMagic { found: [u8; 4] },
	#[error("unsupported {field} version {major}.{minor}")]
	UnsupportedVersion {
		field: &'static str,
		major: u32,
		minor: u32,
	},
	#[error("malformed {0}")]
	Malformed(String),
	#[error("access of {size} bytes at offset {offset} is out of range for a buffer of {len} bytes")]
	OutOfRange { offset: usize, size: usize, len: usize },
	#[error("corrupt compressed data: {0}")]
	CorruptData(String),
	#[error("protocol violation: {0}")]
	ProtocolViolation(String),
	#[error("boolean property {id:#010X} cannot be represented in the text format")]
	UnsupportedTextBoolean { id: u32 },
	#[error("no type information for property {id:#010X}")]
	UnknownProperty { id: u32 },
	#[error("value for property {id:#010X} cannot be stored as {value_type:?}")]
	TypeMismatch {
		id: u32,
		value_type: PropertyValueType,
	},
	#[error("character {0:?} cannot be encoded")]
	UnencodableString(char),
	#[error("buffer was already compressed")]
	AlreadyCompressed,
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Parse(#[from] binrw::Error),
}

impl From<RefPackError> for DbpfError {
	fn from(value: RefPackError) -> Self {
		DbpfError::CorruptData(value.to_string())
	}
}

/// A decode failure of a single entry, tagged with the entry it came from.
#[derive(Error, Debug)]
#[error("could not decode entry {tgi}: {source}")]
pub struct EntryDecodeError {
	pub tgi: Tgi,
	#[source]
	pub source: DbpfError,
}

pub type Result<T, E = DbpfError> = std::result::Result<T, E>;
