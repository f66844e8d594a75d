// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;
use dbpf::internal_file::DecodedFile;
use dbpf_utils::{application_main, package_paths, Error, LoadedPackage};
use futures::{stream, StreamExt};
use humansize::{format_size, DECIMAL};
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "Decode every entry of SimCity 4 DBPF files and report the ones that fail")]
struct Args {
	/// Also log the entries that decode
	#[arg(short, long)]
	verbose: bool,

	#[arg(required = true)]
	file_or_directory: Vec<PathBuf>,
}

#[derive(Default)]
struct Summary {
	bytes: usize,
	entries: usize,
	exemplars: usize,
	failed: usize,
}

fn decode_package(path: PathBuf, verbose: bool) -> Result<Summary, Error> {
	let package = LoadedPackage::read(&path)?;
	let mut summary = Summary {
		bytes: package.data.len(),
		..Summary::default()
	};
	for result in package.file.decode_all(&mut package.reader()) {
		summary.entries += 1;
		match result {
			Ok((tgi, decoded)) => {
				if let DecodedFile::Exemplar(exemplar) = &decoded {
					summary.exemplars += 1;
					if verbose {
						info!(
							"{tgi}: {} with {} properties",
							if exemplar.is_cohort { "cohort" } else { "exemplar" },
							exemplar.properties.len()
						);
					}
				} else if verbose {
					info!("{tgi}: {}", tgi.file_type().extension());
				}
			}
			Err(source) => {
				summary.failed += 1;
				error!(
					"{}",
					Error::Entry {
						path: path.clone(),
						source
					}
				);
			}
		}
	}
	Ok(summary)
}

#[tokio::main]
async fn main() {
	let args = Args::parse();

	application_main(|| async {
		let verbose = args.verbose;
		let total = stream::iter(package_paths(&args.file_or_directory))
			.map(|path| async move {
				let display = path.display().to_string();
				(display, tokio_rayon::spawn(move || decode_package(path, verbose)).await)
			})
			.buffer_unordered(num_cpus::get())
			.fold(Summary::default(), |total, (path, result)| async move {
				match result {
					Ok(summary) => {
						println!(
							"{path}: {} entries, {} exemplars, {} failed",
							summary.entries, summary.exemplars, summary.failed
						);
						Summary {
							bytes: total.bytes + summary.bytes,
							entries: total.entries + summary.entries,
							exemplars: total.exemplars + summary.exemplars,
							failed: total.failed + summary.failed,
						}
					}
					Err(err) => {
						error!("{err}");
						total
					}
				}
			})
			.await;

		println!(
			"Read {} in {} entries ({} exemplars), {} failed to decode",
			format_size(total.bytes, DECIMAL),
			total.entries,
			total.exemplars,
			total.failed
		);
	})
	.await;
}
