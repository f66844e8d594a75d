// SPDX-FileCopyrightText: 2023-2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod exemplar;

use std::fmt::{Debug, Formatter};

use base64::{prelude::BASE64_STANDARD, Engine};
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::{
	error::{DbpfError, Result},
	filetypes::{DBPFFileType, PayloadKind},
	internal_file::exemplar::ExemplarData,
};

#[derive(Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum DecodedFile {
	Exemplar(ExemplarData),
	Text(String),
	Binary(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&BASE64_STANDARD.encode(data))
}

impl DecodedFile {
	/// Interprets decompressed entry data according to its type id.
	pub fn decode_bytes(data: Vec<u8>, file_type: DBPFFileType) -> Result<Self> {
		match file_type.kind() {
			PayloadKind::Exemplar => ExemplarData::decode(&data).map(DecodedFile::Exemplar),
			PayloadKind::Text => String::from_utf8(data)
				.map(DecodedFile::Text)
				.map_err(|err| DbpfError::ProtocolViolation(format!("text entry is not utf-8: {err}"))),
			PayloadKind::Binary => Ok(DecodedFile::Binary(data)),
		}
	}

	/// Base64 form of an opaque payload, for transports that can not carry raw bytes.
	pub fn to_base64(&self) -> Option<String> {
		match self {
			DecodedFile::Binary(data) => Some(BASE64_STANDARD.encode(data)),
			_ => None,
		}
	}
}

/// Bytes shown by the `Debug` form of an opaque payload.
const DEBUG_PREVIEW_LEN: usize = 16;

impl Debug for DecodedFile {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			DecodedFile::Exemplar(exemplar) => f.debug_tuple("Exemplar").field(exemplar).finish(),
			DecodedFile::Text(text) => f.debug_tuple("Text").field(text).finish(),
			DecodedFile::Binary(data) => {
				let preview = data
					.iter()
					.take(DEBUG_PREVIEW_LEN)
					.map(|byte| format!("{byte:02x}"))
					.join(" ");
				let more = if data.len() > DEBUG_PREVIEW_LEN { " .." } else { "" };
				write!(f, "Binary({} bytes: {preview}{more})", data.len())
			}
		}
	}
}
