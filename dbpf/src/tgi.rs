// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
	fmt::{Debug, Display, Formatter},
	str::FromStr,
};

use binrw::binrw;
use serde::{Deserialize, Serialize};

use crate::{buffer::FixedWidth, filetypes::DBPFFileType};

/// Type, group and instance id; the key of every entry in a package.
#[binrw]
#[brw(little)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u32; 3]", into = "[u32; 3]")]
pub struct Tgi {
	pub type_id: u32,
	pub group_id: u32,
	pub instance_id: u32,
}

impl Tgi {
	pub const ZERO: Tgi = Tgi::new(0, 0, 0);

	pub const fn new(type_id: u32, group_id: u32, instance_id: u32) -> Self {
		Self {
			type_id,
			group_id,
			instance_id,
		}
	}

	pub fn file_type(&self) -> DBPFFileType {
		DBPFFileType::from(self.type_id)
	}

	pub fn is_zero(&self) -> bool {
		*self == Self::ZERO
	}
}

impl FixedWidth for Tgi {
	const WIDTH: usize = 12;
}

impl From<[u32; 3]> for Tgi {
	fn from([t, g, i]: [u32; 3]) -> Self {
		Self::new(t, g, i)
	}
}

impl From<Tgi> for [u32; 3] {
	fn from(value: Tgi) -> Self {
		[value.type_id, value.group_id, value.instance_id]
	}
}

impl Display for Tgi {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{:#010X}-{:#010X}-{:#010X}",
			self.type_id, self.group_id, self.instance_id
		)
	}
}

impl Debug for Tgi {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "Tgi({self})")
	}
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
#[error("expected three hexadecimal ids separated by '-', got {0:?}")]
pub struct ParseTgiError(String);

impl FromStr for Tgi {
	type Err = ParseTgiError;

	/// Parses the [`Display`] form, `0xTTTTTTTT-0xGGGGGGGG-0xIIIIIIII`; the `0x` prefixes are optional.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts = s
			.split('-')
			.map(|part| {
				let part = part.trim();
				let hex = part
					.strip_prefix("0x")
					.or_else(|| part.strip_prefix("0X"))
					.unwrap_or(part);
				u32::from_str_radix(hex, 16).map_err(|_| ParseTgiError(s.to_string()))
			})
			.collect::<Result<Vec<_>, _>>()?;
		match parts[..] {
			[t, g, i] => Ok(Tgi::new(t, g, i)),
			_ => Err(ParseTgiError(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_and_parse() {
		let tgi = Tgi::new(0x6534284A, 0x1234, 0xABCDEF01);
		assert_eq!(tgi.to_string(), "0x6534284A-0x00001234-0xABCDEF01");
		assert_eq!(tgi.to_string().parse::<Tgi>(), Ok(tgi));
		assert_eq!("6534284a-1234-abcdef01".parse::<Tgi>(), Ok(tgi));
		assert!("1-2".parse::<Tgi>().is_err());
		assert!("1-2-zz".parse::<Tgi>().is_err());
	}

	#[test]
	fn json_is_a_triple() {
		let tgi = Tgi::new(1, 2, 3);
		assert_eq!(serde_json::to_string(&tgi).unwrap(), "[1,2,3]");
		assert_eq!(serde_json::from_str::<Tgi>("[1,2,3]").unwrap(), tgi);
	}
}
