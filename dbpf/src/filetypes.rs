// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

// type ids as used by SimCity 4 packages and the .dat files shipped with the game

use derive_more::TryFrom;
use enum_iterator::Sequence;

#[repr(u32)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Sequence, TryFrom)]
#[try_from(repr)]
#[non_exhaustive]
pub enum KnownDBPFFileType {
	// UI
	UserInterface = 0x00000000,
	// COHT
	Cohort = 0x05342861,
	// RUL
	NetworkRules = 0x0A5BCF4B,
	// LTEXT
	LocaleText = 0x2026960B,
	// PATH
	Path = 0x296678F7,
	// S3D
	Model3D = 0x5AD0E817,
	// EXMP
	Exemplar = 0x6534284A,
	// LD
	LotDefinition = 0x6BE74C60,
	// FSH
	FshTexture = 0x7AB50E44,
	// PNG
	PngImage = 0x856DDBAC,
	// KEYCFG
	KeyConfig = 0xA2E3D533,
	// LUA
	LuaScript = 0xCA63E2A3,
	// DIR
	DBPFDirectory = 0xE86B1EEF,
	// EFFDIR
	EffectDirectory = 0xEA5118B0,
}

/// How the payload of an entry is interpreted when it is decoded.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PayloadKind {
	/// Exemplar or Cohort property bag
	Exemplar,
	/// UTF-8 text
	Text,
	/// Passed through untouched
	Binary,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum DBPFFileType {
	Known(KnownDBPFFileType),
	Unknown(u32),
}

pub struct FileTypeProperties {
	/// Human readable name, subject to change at any time
	pub name: &'static str,
	/// Short abbreviation, as used by the common modding tools
	/// WARNING: abbreviations are not guaranteed to be unique
	pub abbreviation: &'static str,
	/// File extension (unique)
	pub extension: Option<&'static str>,
	pub kind: PayloadKind,
}

impl KnownDBPFFileType {
	pub fn properties(&self) -> FileTypeProperties {
		use KnownDBPFFileType::*;
		let (name, abbreviation, extension, kind) = match self {
			UserInterface => ("User Interface", "UI", Some("ui.txt"), PayloadKind::Text),
			Cohort => ("Cohort", "COHT", Some("cohort"), PayloadKind::Exemplar),
			NetworkRules => ("Network Rules", "RUL", Some("rul"), PayloadKind::Text),
			LocaleText => ("Locale Text", "LTEXT", Some("ltext"), PayloadKind::Binary),
			Path => ("Path", "PATH", Some("sc4path"), PayloadKind::Binary),
			Model3D => ("3D Model", "S3D", Some("s3d"), PayloadKind::Binary),
			Exemplar => ("Exemplar", "EXMP", Some("exemplar"), PayloadKind::Exemplar),
			LotDefinition => ("Lot Definition", "LD", Some("ld"), PayloadKind::Binary),
			FshTexture => ("FSH Texture", "FSH", Some("fsh"), PayloadKind::Binary),
			PngImage => ("PNG Image", "PNG", Some("png"), PayloadKind::Binary),
			KeyConfig => ("Key Configuration", "KEYCFG", Some("keycfg"), PayloadKind::Binary),
			LuaScript => ("Lua Script", "LUA", Some("lua"), PayloadKind::Text),
			DBPFDirectory => ("DBPF Directory", "DIR", Some("dir"), PayloadKind::Binary),
			EffectDirectory => ("Effect Directory", "EFFDIR", Some("effdir"), PayloadKind::Binary),
		};
		FileTypeProperties {
			name,
			abbreviation,
			extension,
			kind,
		}
	}
}

impl From<u32> for DBPFFileType {
	fn from(value: u32) -> Self {
		KnownDBPFFileType::try_from(value)
			.map(DBPFFileType::Known)
			.unwrap_or(DBPFFileType::Unknown(value))
	}
}

impl DBPFFileType {
	pub fn code(&self) -> u32 {
		match self {
			DBPFFileType::Known(t) => (*t) as u32,
			DBPFFileType::Unknown(n) => *n,
		}
	}

	pub fn properties(&self) -> Option<FileTypeProperties> {
		match self {
			DBPFFileType::Known(t) => Some(t.properties()),
			DBPFFileType::Unknown(_) => None,
		}
	}

	pub fn kind(&self) -> PayloadKind {
		self.properties()
			.map(|p| p.kind)
			.unwrap_or(PayloadKind::Binary)
	}

	pub fn extension(&self) -> String {
		match self {
			Self::Known(t) => t
				.properties()
				.extension
				.map(|s| s.to_string())
				.unwrap_or_else(|| format!("{t:?}")),
			Self::Unknown(u) => format!("{u:08X}"),
		}
	}
}
