// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;
use dbpf::{internal_file::DecodedFile, Tgi};
use dbpf_utils::{application_main, read_property_info, Error, LoadedPackage};
use humansize::{format_size, DECIMAL};

#[derive(Parser)]
#[command(version, about = "Show the contents of a SimCity 4 DBPF file")]
struct Args {
	file: PathBuf,

	/// Decode a single entry, given as 0xTTTTTTTT-0xGGGGGGGG-0xIIIIIIII
	#[arg(short, long)]
	tgi: Option<Tgi>,

	/// Print exemplars in the plain text format instead of json
	#[arg(long)]
	text: bool,

	/// Json table of property names and types
	#[arg(short, long)]
	properties: Option<PathBuf>,
}

fn list(package: &LoadedPackage) {
	let file = &package.file;
	println!("created:  {}", file.created_iso());
	println!("modified: {}", file.modified_iso());
	println!(
		"index:    {} entries at {:#x}",
		file.header.index_entry_count, file.header.index_offset
	);
	for entry in file.entries.values() {
		let file_type = entry.file_type();
		let name = file_type
			.properties()
			.map(|properties| properties.abbreviation.to_string())
			.unwrap_or_else(|| file_type.extension());
		match entry.uncompressed_size {
			Some(uncompressed) => println!(
				"{}  {name:<8} {} ({} compressed)",
				entry.id,
				format_size(uncompressed, DECIMAL),
				format_size(entry.size, DECIMAL)
			),
			None => println!(
				"{}  {name:<8} {}",
				entry.id,
				format_size(entry.size, DECIMAL)
			),
		}
	}
}

fn dump(args: &Args) -> Result<(), Error> {
	let package = LoadedPackage::read(&args.file)?;
	let Some(tgi) = args.tgi else {
		list(&package);
		return Ok(());
	};
	let package_error = |source| Error::Package {
		path: args.file.clone(),
		source,
	};
	let Some(entry) = package.file.entry(&tgi) else {
		eprintln!("{tgi} is not in {}", args.file.display());
		return Ok(());
	};
	let decoded = entry
		.decode(&mut package.reader())
		.map_err(|source| Error::Entry {
			path: args.file.clone(),
			source,
		})?;
	match decoded {
		DecodedFile::Exemplar(exemplar) if args.text => {
			let info = read_property_info(args.properties.as_deref())?;
			let text = exemplar.to_text(Some(&info)).map_err(package_error)?;
			println!("{text}");
		}
		decoded => println!("{}", serde_json::to_string_pretty(&decoded)?),
	}
	Ok(())
}

#[tokio::main]
async fn main() {
	let args = Args::parse();

	application_main(|| async {
		if let Err(err) = dump(&args) {
			eprintln!("{err}");
		}
	})
	.await;
}
