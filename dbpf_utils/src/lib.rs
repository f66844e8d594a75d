// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
	collections::HashMap,
	future::Future,
	io::Cursor,
	path::{Path, PathBuf},
};

use dbpf::{
	internal_file::DecodedFile, DbpfError, DbpfFile, EntryDecodeError, ExemplarData, PropertyInfo,
	PropertyInfoTable, Tgi,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

/// Extensions of the files the game reads packages from.
pub const PACKAGE_EXTENSIONS: &[&str] = &["dat", "sc4", "sc4desc", "sc4lot", "sc4model", "package"];

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("{}: {source}", .path.display())]
	Package { path: PathBuf, source: DbpfError },
	#[error("{}: {source}", .path.display())]
	Entry {
		path: PathBuf,
		source: EntryDecodeError,
	},
	#[error("bad property id {0:?}")]
	PropertyId(String),
}

/// Sets up logging, then runs `main` and reports how long it took.
pub async fn application_main<Fut>(main: impl FnOnce() -> Fut) -> Fut::Output
where
	Fut: Future,
{
	let registry = tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));
	#[cfg(feature = "tracy")]
	let registry = registry.with(tracing_tracy::TracyLayer::default());
	if let Err(err) = registry.try_init() {
		eprintln!("could not set up logging: {err}");
	}
	std::panic::set_hook(Box::new(tracing_panic::panic_hook));

	let start = Instant::now();

	let output = main().await;

	debug!("finished in {:?}", start.elapsed());
	output
}

pub fn is_package_path(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| {
			PACKAGE_EXTENSIONS
				.iter()
				.any(|known| ext.eq_ignore_ascii_case(known))
		})
}

/// All package files in or below the given files and directories.
pub fn package_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
	inputs
		.iter()
		.flat_map(|input| WalkDir::new(input).sort_by_file_name())
		.filter_map(|entry| match entry {
			Ok(entry) => Some(entry),
			Err(err) => {
				warn!("{err}");
				None
			}
		})
		.filter(|entry| entry.file_type().is_file() && is_package_path(entry.path()))
		.map(|entry| entry.into_path())
		.collect()
}

/// A package parsed together with its bytes, so that entries can be decoded from memory.
pub struct LoadedPackage {
	pub path: PathBuf,
	pub file: DbpfFile,
	pub data: Vec<u8>,
}

impl LoadedPackage {
	pub fn read(path: &Path) -> Result<Self, Error> {
		let data = std::fs::read(path)?;
		let file = DbpfFile::from_bytes(&data).map_err(|source| Error::Package {
			path: path.to_path_buf(),
			source,
		})?;
		debug!("{}: {} entries", path.display(), file.entries.len());
		Ok(Self {
			path: path.to_path_buf(),
			file,
			data,
		})
	}

	pub fn reader(&self) -> Cursor<&[u8]> {
		Cursor::new(self.data.as_slice())
	}

	/// Every exemplar and cohort that decodes; the others are logged and skipped.
	pub fn exemplars(&self) -> Vec<(Tgi, ExemplarData)> {
		let mut reader = self.reader();
		self.file
			.exemplars()
			.filter_map(|entry| match entry.decode(&mut reader) {
				Ok(DecodedFile::Exemplar(exemplar)) => Some((entry.id, exemplar)),
				Ok(_) => None,
				Err(err) => {
					warn!("{}: {err}", self.path.display());
					None
				}
			})
			.collect()
	}
}

/// Reads a property table of the form `{"0x00000020": {"name": "Exemplar Name", "valueType": "String"}}`;
/// ids may also be written in decimal.
pub fn parse_property_info(json: &str) -> Result<PropertyInfoTable, Error> {
	serde_json::from_str::<HashMap<String, PropertyInfo>>(json)?
		.into_iter()
		.map(|(id, info)| {
			let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
				Some(hex) => u32::from_str_radix(hex, 16),
				None => id.parse(),
			};
			parsed
				.map(|id| (id, info))
				.map_err(|_| Error::PropertyId(id.clone()))
		})
		.collect()
}

pub fn read_property_info(path: Option<&Path>) -> Result<PropertyInfoTable, Error> {
	match path {
		Some(path) => parse_property_info(&std::fs::read_to_string(path)?),
		None => Ok(PropertyInfoTable::new()),
	}
}

#[cfg(test)]
mod tests {
	use dbpf::PropertyValueType;

	use super::*;

	#[test]
	fn package_extensions() {
		assert!(is_package_path(Path::new("SimCity_1.dat")));
		assert!(is_package_path(Path::new("Plugins/park.SC4Lot")));
		assert!(is_package_path(Path::new("Plugins/park.sc4desc")));
		assert!(!is_package_path(Path::new("readme.txt")));
		assert!(!is_package_path(Path::new("dat")));
	}

	#[test]
	fn property_info() {
		let info = parse_property_info(
			r#"{
				"0x00000020": {"name": "Exemplar Name", "valueType": "String"},
				"16": {"name": "Exemplar Type", "valueType": "UInt32"}
			}"#,
		)
		.unwrap();
		assert_eq!(info.len(), 2);
		assert_eq!(info[&0x20].name, "Exemplar Name");
		assert_eq!(info[&0x10].value_type, PropertyValueType::UInt32);

		assert!(matches!(
			parse_property_info(r#"{"0xZZ": {"name": "", "valueType": "Bool"}}"#),
			Err(Error::PropertyId(id)) if id == "0xZZ"
		));
		assert!(matches!(
			parse_property_info(r#"{"1": {"name": "", "valueType": "Int"}}"#),
			Err(Error::Json(_))
		));
		assert!(read_property_info(None).unwrap().is_empty());
	}

	#[test]
	fn entry_errors_name_the_entry() {
		let err = Error::Entry {
			path: PathBuf::from("park.dat"),
			source: EntryDecodeError {
				tgi: Tgi::new(0x6534284A, 0x0FF0A51A, 0x1),
				source: DbpfError::ProtocolViolation("bad tag".to_string()),
			},
		};
		assert_eq!(
			err.to_string(),
			"park.dat: could not decode entry 0x6534284A-0x0FF0A51A-0x00000001: protocol violation: bad tag"
		);
	}
}
