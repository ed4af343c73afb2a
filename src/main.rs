/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use crate::config::config_file::TaxSettings;
use crate::parsing::filesystem::Filesystem;
use crate::parsing::transactions::load_transactions;
use crate::reference::base_rates::BaseRateTable;
use crate::reference::instruments::InstrumentTable;
use crate::reference::prices::PriceTable;
use crate::reports::annual_reporter::AnnualReporter;
use crate::reports::event_export::write_events;
use crate::reports::fault_reporter::FaultReporter;
use crate::reports::lot_reporter::LotReporter;
use crate::tax::driver;
use crate::tax::engine::TaxEngine;
use crate::tax::event::EventKind;
use crate::util::date::Date;
use anyhow::{bail, Error};
use clap::{ArgAction, Parser, ValueEnum};
use log::{info, warn};
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;

mod config;
mod investment;
mod parsing;
mod reference;
mod reports;
mod tax;
mod util;

#[derive(Parser)]
#[command(
	name = "fundtax",
	version = "0.1",
	about = "Lot accounting and deemed-distribution tax for fund portfolios"
)]
struct Cli {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// The command to execute
	command: Directive,

	// -----------
	// -- FLAGS --
	// -----------
	/// Transaction export(s) to read, CSV
	#[arg(short = 'f', long = "file", required = true)]
	files: Vec<String>,

	/// First tax year to report
	#[arg(short, long)]
	begin: Option<i32>,

	/// Last tax year to report; processing always runs at least this far
	#[arg(short, long)]
	end: Option<i32>,

	/// Custom config file location (default: ~/.config/fundtax/config.toml)
	#[arg(long)]
	config: Option<String>,

	/// Year-end price file, overriding the config
	#[arg(long)]
	prices: Option<String>,

	/// Base rate file, overriding the config
	#[arg(long)]
	rates: Option<String>,

	/// Instrument classification file, overriding the config
	#[arg(long)]
	instruments: Option<String>,

	/// Only export events of this kind (SELL, DIV, WHT, VAP, INT)
	#[arg(short, long)]
	kind: Option<String>,

	/// Decimal places to show for amounts
	#[arg(short, long, default_value_t = 2)]
	precision: u32,

	/// Log more; repeat for debug and trace output
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl Cli {
	/// Enough for any currency; more only prints rounding noise.
	const MAX_PRECISION: u32 = 10;

	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		if self.precision > Cli::MAX_PRECISION {
			bail!("Maximum precision is {}", Cli::MAX_PRECISION);
		}

		if let (Some(begin), Some(end)) = (self.begin, self.end) {
			if begin > end {
				bail!("Begin year {} is after end year {}", begin, end);
			}
		}

		if self.kind.is_some() && self.command != Directive::Events {
			bail!("--kind only applies to events");
		}

		Ok(())
	}
}

#[derive(ValueEnum, Clone, PartialEq)]
enum Directive {
	Report, // annual tax statements
	Events, // ledger as CSV
	Lots,   // open lots after the last year

	Check, // ingestion summary and faults
}

fn main() -> Result<(), Error> {
	let args = Cli::parse();
	args.validate()?;
	init_logging(args.verbose);

	let kind = args.kind.as_deref().map(EventKind::parse).transpose()?;

	let fs = Filesystem::new();
	let config = fs.get_config(args.config.as_ref())?;
	let settings = config.tax_settings();
	let data = config.data.unwrap_or_default();

	let instruments =
		match args.instruments.as_ref().or(data.instruments.as_ref()) {
			Some(path) => {
				InstrumentTable::load(Path::new(path), settings.default_exemption_rate)?
			},
			None => InstrumentTable::new(settings.default_exemption_rate),
		};

	let prices = match args.prices.as_ref().or(data.prices.as_ref()) {
		Some(path) => PriceTable::load(Path::new(path))?,
		None => {
			warn!("No price file configured; deemed distributions cannot be computed");
			PriceTable::new()
		},
	};

	let base_rates = match args.rates.as_ref().or(data.base_rates.as_ref()) {
		Some(path) => BaseRateTable::load(Path::new(path))?,
		None => {
			warn!("No base rate file configured; every year is treated as zero rate");
			BaseRateTable::new()
		},
	};

	info!(
		"Reference data: {} instruments, {} prices, {} base rates",
		instruments.len(),
		prices.len(),
		base_rates.len()
	);

	let load = load_transactions(&args.files)?;
	let mut engine = TaxEngine::new(&instruments, &base_rates, &prices);
	let processed = driver::run(&mut engine, &load.transactions, args.end);

	match args.command {
		Directive::Report => {
			let Some(processed) = processed else {
				println!("No transactions");
				return Ok(());
			};
			let years = report_years(&args, &settings, &processed);
			for year in years.clone() {
				let affected = engine.faults().for_year(year).count();
				if affected > 0 {
					warn!("{}: {} faults affect this statement, see `check`", year, affected);
				}
			}
			AnnualReporter::new(engine.ledger(), &settings, args.precision).print(years);
		},
		Directive::Events => {
			let Some(processed) = processed else {
				return Ok(());
			};
			let years = report_years(&args, &settings, &processed);
			write_events(io::stdout().lock(), engine.ledger(), years, kind, args.precision)?;
		},
		Directive::Lots => {
			let Some(processed) = processed else {
				println!("No transactions");
				return Ok(());
			};
			let as_of = Date::new(*processed.end(), 12, 31)?;
			let reporter = LotReporter::new(engine.portfolio().open_lots(), args.precision);
			print!("{}", reporter.render(&as_of));
		},
		Directive::Check => {
			info!("Distributions attributed by {}", engine.policy_name());
			print!("{}", FaultReporter::new(&load, engine.faults()).render());
		},
	}

	Ok(())
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
		.format_timestamp(None)
		.init();
}

/// Years to report: from --begin, the configured first year, or the first
/// year processed, through --end or the last year processed.
fn report_years(
	args: &Cli,
	settings: &TaxSettings,
	processed: &RangeInclusive<i32>,
) -> RangeInclusive<i32> {
	let begin = args
		.begin
		.or(settings.first_report_year)
		.unwrap_or(*processed.start());
	let end = args.end.unwrap_or(*processed.end());
	begin..=end
}
