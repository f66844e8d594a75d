// SPDX-FileCopyrightText: 2023-2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reading of SimCity 4 DBPF packages and the Exemplar and Cohort records stored in them.
//!
//! ```no_run
//! use std::fs::File;
//!
//! use dbpf::{internal_file::DecodedFile, DbpfFile};
//!
//! let mut file = File::open("SimCity_1.dat")?;
//! let package = DbpfFile::read(&mut file)?;
//! for entry in package.exemplars() {
//!     if let Ok(DecodedFile::Exemplar(exemplar)) = entry.decode(&mut file) {
//!         println!("{} has {} properties", entry.id, exemplar.properties.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod buffer;
pub mod compression;
pub mod dbpf_file;
pub mod error;
pub mod filetypes;
pub mod header;
pub mod internal_file;
pub mod tgi;

pub use dbpf_file::{ContainerEntry, DbpfFile};
pub use error::{DbpfError, EntryDecodeError, Result};
pub use internal_file::{
	exemplar::{
		patch::{apply, diff, Change, ExemplarPatch, Scalar, ScalarOrVector},
		ExemplarData, Property, PropertyInfo, PropertyInfoTable, PropertyValue, PropertyValueType,
		Values,
	},
	DecodedFile,
};
pub use tgi::Tgi;
