// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{collections::HashMap, path::PathBuf};

use clap::Parser;
use dbpf::{apply, diff, ExemplarData, ExemplarPatch, Tgi};
use dbpf_utils::{application_main, read_property_info, Error, LoadedPackage};
use serde_json::{Map, Value};
use tracing::{error, info};

#[derive(Parser)]
#[command(
	version,
	about = "Show the property changes between the exemplars of two SimCity 4 DBPF files as json patches"
)]
struct Args {
	original: PathBuf,
	modified: PathBuf,

	/// Apply every patch to the original again and check that it gives the modified exemplar
	#[arg(long)]
	verify: bool,

	/// Json table of property names and types, needed to verify patches that add properties
	#[arg(short, long)]
	properties: Option<PathBuf>,

	/// Also write the patches to this file
	#[arg(long)]
	patch: Option<PathBuf>,
}

fn load(path: PathBuf) -> Result<HashMap<Tgi, ExemplarData>, Error> {
	let package = LoadedPackage::read(&path)?;
	Ok(package.exemplars().into_iter().collect())
}

fn run(args: Args) -> Result<(), Error> {
	let info = read_property_info(args.properties.as_deref())?;
	let original_path = args.original.clone();
	let original = load(args.original)?;
	let modified_list = LoadedPackage::read(&args.modified)?.exemplars();

	let mut patches = Map::new();
	let mut verified = 0;
	for (tgi, modified) in modified_list {
		let base = original
			.get(&tgi)
			.cloned()
			.unwrap_or_else(|| ExemplarData::new(modified.is_cohort, Tgi::ZERO));
		let Some(patch) = diff(&modified, &base) else {
			continue;
		};
		if args.verify {
			match apply(&base, &patch, &info) {
				Ok(patched) if patched.normalized() == modified.normalized() => verified += 1,
				Ok(_) => error!("{tgi}: patch does not reproduce the modified exemplar"),
				Err(source) => error!(
					"{tgi}: {}",
					Error::Package {
						path: original_path.clone(),
						source
					}
				),
			}
		}
		patches.insert(tgi.to_string(), serde_json::to_value::<ExemplarPatch>(patch)?);
	}
	if args.verify {
		info!("{verified} of {} patches verified", patches.len());
	}
	let json = serde_json::to_string_pretty(&Value::Object(patches))?;
	if let Some(path) = &args.patch {
		std::fs::write(path, &json)?;
	}
	println!("{json}");
	Ok(())
}

#[tokio::main]
async fn main() {
	let args = Args::parse();

	application_main(|| async move {
		let result = tokio_rayon::spawn(move || run(args)).await;
		if let Err(err) = result {
			eprintln!("{err}");
		}
	})
	.await;
}
