// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Cursor, Read, Seek, SeekFrom};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use crate::{
	buffer::ReadBuffer,
	compression,
	error::{DbpfError, EntryDecodeError, Result},
	filetypes::{DBPFFileType, KnownDBPFFileType, PayloadKind},
	header::{DbpfHeader, DirectoryEntry, IndexEntry, DIRECTORY_ENTRY_SIZE, HEADER_SIZE},
	internal_file::DecodedFile,
	tgi::Tgi,
};

/// Location of one entry in the package.
///
/// `uncompressed_size` is only present for entries listed in the directory, which marks them as
/// compressed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEntry {
	pub id: Tgi,
	pub offset: u32,
	pub size: u32,
	pub uncompressed_size: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct DbpfFile {
	pub header: DbpfHeader,
	pub created: DateTime<Utc>,
	pub modified: DateTime<Utc>,
	pub entries: IndexMap<Tgi, ContainerEntry>,
}

pub(crate) fn read_range<R: Read + Seek>(reader: &mut R, offset: u64, size: usize) -> Result<Vec<u8>> {
	let len = reader.seek(SeekFrom::End(0))?;
	let in_range = offset
		.checked_add(size as u64)
		.is_some_and(|end| end <= len);
	if !in_range {
		return Err(DbpfError::OutOfRange {
			offset: offset as usize,
			size,
			len: len as usize,
		});
	}
	reader.seek(SeekFrom::Start(offset))?;
	let mut data = vec![0; size];
	reader.read_exact(&mut data)?;
	Ok(data)
}

impl DbpfFile {
	/// Reads the header, index and directory; entry payloads are only read on request.
	pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
		let header_bytes = read_range(reader, 0, HEADER_SIZE)?;
		let header: DbpfHeader = ReadBuffer::new(&header_bytes).read(None)?;
		header.validate()?;
		debug!(
			"read header: {} index entries at {:#x}",
			header.index_entry_count, header.index_offset
		);

		let mut entries = IndexMap::with_capacity(header.index_entry_count as usize);
		for record in Self::read_index(reader, &header)? {
			let entry = ContainerEntry {
				id: record.tgi,
				offset: record.location,
				size: record.size,
				uncompressed_size: None,
			};
			if entries.insert(record.tgi, entry).is_some() {
				warn!("duplicate index entry {}, keeping the last one", record.tgi);
			}
		}
		debug!("read index: {} entries", entries.len());

		let directory = entries
			.values()
			.find(|entry| entry.file_type() == DBPFFileType::Known(KnownDBPFFileType::DBPFDirectory))
			.copied();
		if let Some(directory) = directory {
			let data = directory.read_raw(reader)?;
			let records = Self::parse_directory(&data)?;
			debug!("read directory: {} compressed entries", records.len());
			for record in records {
				match entries.get_mut(&record.tgi) {
					Some(entry) => entry.uncompressed_size = Some(record.decompressed_size),
					None => warn!("directory lists {} which is not in the index", record.tgi),
				}
			}
		}

		Ok(Self {
			created: header.created.to_datetime(),
			modified: header.modified.to_datetime(),
			header,
			entries,
		})
	}

	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		Self::read(&mut Cursor::new(data))
	}

	fn read_index<R: Read + Seek>(reader: &mut R, header: &DbpfHeader) -> Result<Vec<IndexEntry>> {
		let count = header.index_entry_count as usize;
		if count == 0 {
			return Ok(vec![]);
		}
		let entry_size = header.index_entry_size()?;
		let data = read_range(reader, header.index_offset as u64, header.index_size as usize)?;
		let mut buf = ReadBuffer::new(&data);
		(0..count)
			.map(|i| buf.read(Some(i * entry_size)))
			.collect()
	}

	fn parse_directory(data: &[u8]) -> Result<Vec<DirectoryEntry>> {
		if data.len() % DIRECTORY_ENTRY_SIZE != 0 {
			return Err(DbpfError::Malformed(format!(
				"directory of {} bytes is not a whole number of entries",
				data.len()
			)));
		}
		let mut buf = ReadBuffer::new(data);
		(0..data.len() / DIRECTORY_ENTRY_SIZE)
			.map(|_| buf.read(None))
			.collect()
	}

	pub fn created_iso(&self) -> String {
		self.created.to_rfc3339_opts(SecondsFormat::Millis, true)
	}

	pub fn modified_iso(&self) -> String {
		self.modified.to_rfc3339_opts(SecondsFormat::Millis, true)
	}

	pub fn entry(&self, tgi: &Tgi) -> Option<&ContainerEntry> {
		self.entries.get(tgi)
	}

	/// All Exemplar and Cohort entries, in index order.
	pub fn exemplars(&self) -> impl Iterator<Item = &ContainerEntry> {
		self.entries
			.values()
			.filter(|entry| entry.file_type().kind() == PayloadKind::Exemplar)
	}

	/// Decodes every entry; a failing entry does not stop the others from being decoded.
	pub fn decode_all<R: Read + Seek>(
		&self,
		reader: &mut R,
	) -> Vec<Result<(Tgi, DecodedFile), EntryDecodeError>> {
		self.entries
			.values()
			.map(|entry| entry.decode(reader).map(|decoded| (entry.id, decoded)))
			.collect()
	}
}

impl ContainerEntry {
	pub fn file_type(&self) -> DBPFFileType {
		self.id.file_type()
	}

	pub fn is_compressed(&self) -> bool {
		self.uncompressed_size.is_some()
	}

	/// The bytes as stored in the package.
	pub fn read_raw<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<u8>> {
		read_range(reader, self.offset as u64, self.size as usize)
	}

	/// The payload, decompressed if the directory marks it as compressed.
	pub fn read_data<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<u8>> {
		let raw = self.read_raw(reader)?;
		match self.uncompressed_size {
			None => Ok(raw),
			Some(expected) => {
				let data = compression::decompress(&raw)?;
				if data.len() != expected as usize {
					warn!(
						"entry {} decompressed to {} bytes, directory says {expected}",
						self.id,
						data.len()
					);
				}
				Ok(data)
			}
		}
	}

	pub fn decode<R: Read + Seek>(&self, reader: &mut R) -> Result<DecodedFile, EntryDecodeError> {
		self.read_data(reader)
			.and_then(|data| DecodedFile::decode_bytes(data, self.file_type()))
			.map_err(|source| EntryDecodeError {
				tgi: self.id,
				source,
			})
	}
}
