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
use crate::investment::transaction::{Transaction, TransactionKind};
use crate::parsing::filesystem::Filesystem;
use crate::util::decimal::parse_decimal;
use anyhow::{anyhow, bail, Error};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{info, warn};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Two rows cancel each other if their amounts sum to within this.
const CANCELLATION_TOLERANCE: Decimal = dec!(0.05);

/// Asset classes whose trades and distributions are taxed here.
const TRADED_CLASSES: [&str; 2] = ["STK", "FUND"];

/// Bucket for trades dropped because the symbol looks like a currency pair.
pub const FOREX_BUCKET: &str = "FOREX";

#[derive(Debug, Deserialize)]
struct TransactionRow {
	id: String,
	#[serde(default)]
	isin: String,
	symbol: String,
	#[serde(default)]
	asset_class: String,
	timestamp: String,
	kind: String,
	quantity: String,
	amount: String,
	#[serde(default)]
	fees: String,
	#[serde(default)]
	fx_rate: String,
	#[serde(default)]
	price_origin: String,
	#[serde(default)]
	description: String,
}

/// A row that survived filtering, before cancellations are reconciled.
struct Candidate {
	transaction: Transaction,
	cancellation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelledPair {
	pub original: String,
	pub cancellation: String,
}

/// The cleaned, chronologically sorted transaction stream plus what was
/// dropped on the way.
#[derive(Debug, Default)]
pub struct LoadResult {
	pub transactions: Vec<Transaction>,
	/// Asset class (or the forex bucket) -> symbols ignored
	pub ignored: BTreeMap<String, BTreeSet<String>>,
	pub cancelled_pairs: Vec<CancelledPair>,
	pub orphan_cancellations: Vec<Transaction>,
}

/// Reads broker exports in CSV form. Several files may be loaded; their rows
/// are merged before sorting and reconciliation.
pub struct TransactionLoader {
	fs: Filesystem,
	fx_pair: Regex,
	cancel_marker: Regex,

	candidates: Vec<Candidate>,
	ignored: BTreeMap<String, BTreeSet<String>>,
}

impl TransactionLoader {
	pub fn new() -> Result<Self, Error> {
		Ok(Self {
			fs: Filesystem::new(),
			fx_pair: Regex::new(r"^[A-Z]{3}\.[A-Z]{3}$")?,
			cancel_marker: Regex::new(r"\(Ca\.\)|\[CANCEL\]")?,
			candidates: Vec::new(),
			ignored: BTreeMap::new(),
		})
	}

	pub fn load(&mut self, file_path: &str) -> Result<(), Error> {
		self.fs.declare_file(file_path)?;
		let file = self.fs.open(file_path)?;

		let mut reader = csv::ReaderBuilder::new()
			.trim(csv::Trim::All)
			.comment(Some(b'#'))
			.from_reader(file);

		let before = self.candidates.len();
		for (i, result) in reader.deserialize::<TransactionRow>().enumerate() {
			let row =
				result.map_err(|e| anyhow!("{}: {}", file_path, e))?;
			// header is line 1
			self.add_row(row)
				.map_err(|e| anyhow!("{} (row {}): {}", file_path, i + 2, e))?;
		}

		info!(
			"Loaded {} transactions from {}",
			self.candidates.len() - before,
			file_path
		);
		Ok(())
	}

	fn add_row(&mut self, row: TransactionRow) -> Result<(), Error> {
		let cancellation = row.kind.contains("Ca.")
			|| self.cancel_marker.is_match(&row.kind)
			|| self.cancel_marker.is_match(&row.description);

		let quantity = parse_decimal(&row.quantity)?;
		let kind_text = self.cancel_marker.replace_all(&row.kind, "").replace("Ca.", "");
		let kind = match TransactionKind::parse(&kind_text) {
			Ok(kind) => kind,
			// A bare marker still says which way the trade went
			Err(_) if cancellation && kind_text.trim().is_empty() => {
				if quantity.is_sign_negative() {
					TransactionKind::Sell
				} else {
					TransactionKind::Buy
				}
			},
			Err(e) => return Err(e),
		};

		if !self.accept(kind, &row.asset_class, &row.symbol) {
			return Ok(());
		}

		let fx_rate = match row.fx_rate.trim() {
			"" => Decimal::ONE,
			s => parse_decimal(s)?,
		};

		let transaction = Transaction {
			id: row.id,
			isin: row.isin,
			symbol: row.symbol,
			timestamp: parse_timestamp(&row.timestamp)?,
			kind,
			quantity,
			amount: parse_decimal(&row.amount)?,
			fees: parse_decimal(&row.fees)?.abs(),
			fx_rate,
			price_origin: parse_decimal(&row.price_origin)?,
		};

		self.candidates.push(Candidate {
			transaction,
			cancellation,
		});
		Ok(())
	}

	/// Trades are kept only for stocks and funds, and never for anything that
	/// looks like a currency conversion. Distributions follow the same class
	/// rule; interest is always kept.
	fn accept(&mut self, kind: TransactionKind, asset_class: &str, symbol: &str) -> bool {
		let bucket = match kind {
			TransactionKind::Interest => None,
			_ if kind.is_trade() && asset_class == "CASH" => Some(asset_class),
			_ if kind.is_trade() && self.fx_pair.is_match(symbol) => Some(FOREX_BUCKET),
			_ if !TRADED_CLASSES.contains(&asset_class) => Some(asset_class),
			_ => None,
		};

		match bucket {
			Some(bucket) => {
				let bucket = if bucket.is_empty() { "UNKNOWN" } else { bucket };
				self.ignored
					.entry(bucket.to_string())
					.or_default()
					.insert(symbol.to_string());
				false
			},
			None => true,
		}
	}

	/// Sorts everything loaded so far and removes cancelled trades.
	pub fn finish(self) -> LoadResult {
		let mut candidates = self.candidates;
		candidates.sort_by_key(|c| c.transaction.timestamp);

		let mut removed = vec![false; candidates.len()];
		let mut result = LoadResult {
			ignored: self.ignored,
			..Default::default()
		};

		for i in 0..candidates.len() {
			if !candidates[i].cancellation {
				continue;
			}
			removed[i] = true;

			let cancel = &candidates[i].transaction;
			let original = (0..i).rev().find(|&j| {
				!removed[j]
					&& !candidates[j].cancellation
					&& cancels(cancel, &candidates[j].transaction)
			});

			match original {
				Some(j) => {
					removed[j] = true;
					result.cancelled_pairs.push(CancelledPair {
						original: candidates[j].transaction.id.clone(),
						cancellation: cancel.id.clone(),
					});
				},
				None => {
					warn!(
						"Cancellation {} of {} {} has no original, dropped",
						cancel.id, cancel.quantity, cancel.symbol
					);
					result.orphan_cancellations.push(cancel.clone());
				},
			}
		}

		result.transactions = candidates
			.into_iter()
			.zip(removed)
			.filter(|(_, removed)| !removed)
			.map(|(c, _)| c.transaction)
			.collect();
		result
	}
}

/// Loads and cleans every file in one go.
pub fn load_transactions(paths: &[String]) -> Result<LoadResult, Error> {
	let mut loader = TransactionLoader::new()?;
	for path in paths {
		loader.load(path)?;
	}
	Ok(loader.finish())
}

fn cancels(cancel: &Transaction, original: &Transaction) -> bool {
	cancel.symbol == original.symbol
		&& cancel.quantity == -original.quantity
		&& (cancel.amount + original.amount).abs() <= CANCELLATION_TOLERANCE
}

/// Accepts ISO and compact broker timestamps. A bare date is taken as the
/// end of that day.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, Error> {
	let s = s.trim();
	for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y%m%d;%H%M%S"] {
		if let Ok(timestamp) = NaiveDateTime::parse_from_str(s, format) {
			return Ok(timestamp);
		}
	}

	let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
		.ok_or_else(|| anyhow!("invalid end-of-day time"))?;
	for format in ["%Y-%m-%d", "%Y%m%d"] {
		if let Ok(date) = NaiveDate::parse_from_str(s, format) {
			return Ok(date.and_time(end_of_day));
		}
	}

	bail!("unknown timestamp format: '{}'", s)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const HEADER: &str =
		"id,isin,symbol,asset_class,timestamp,kind,quantity,amount,fees,fx_rate,price_origin,description";

	fn csv_file(rows: &[&str]) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "{}", HEADER).unwrap();
		for row in rows {
			writeln!(file, "{}", row).unwrap();
		}
		file
	}

	fn load(rows: &[&str]) -> LoadResult {
		let file = csv_file(rows);
		load_transactions(&[file.path().to_str().unwrap().to_string()]).unwrap()
	}

	fn ids(result: &LoadResult) -> Vec<&str> {
		result.transactions.iter().map(|tx| tx.id.as_str()).collect()
	}

	#[test]
	fn test_parse_timestamp() {
		let ts = |s| parse_timestamp(s).unwrap().to_string();
		assert_eq!(ts("2021-03-04 10:11:12"), "2021-03-04 10:11:12");
		assert_eq!(ts("20210304;101112"), "2021-03-04 10:11:12");
		assert_eq!(ts("20210304"), "2021-03-04 23:59:59");
		assert_eq!(ts("2021-03-04"), "2021-03-04 23:59:59");
		assert!(parse_timestamp("04.03.2021").is_err());
	}

	#[test]
	fn test_sorted_and_parsed() {
		let result = load(&[
			"T2,IE00B4L5Y983,EUNL,FUND,2021-06-01,SELL,-10,120.50,-1.25,1,12.05,",
			"T1,IE00B4L5Y983,EUNL,FUND,20210110;093000,BUY,10,-100,1,,10,",
		]);

		assert_eq!(ids(&result), vec!["T1", "T2"]);
		let sell = &result.transactions[1];
		assert_eq!(sell.kind, TransactionKind::Sell);
		assert_eq!(sell.quantity, dec!(-10));
		assert_eq!(sell.amount, dec!(120.50));
		assert_eq!(sell.fees, dec!(1.25));
		assert_eq!(result.transactions[0].fx_rate, Decimal::ONE);
	}

	#[test]
	fn test_asset_filter() {
		let result = load(&[
			"1,,EUR.USD,CASH,2021-01-04,BUY,1000,-1000,0,,,",
			"2,,GBP.USD,STK,2021-01-04,BUY,1000,-1000,0,,,",
			"3,,SPY 210319C00400000,OPT,2021-01-04,BUY,1,-300,1,,,",
			"4,,SPY 210319C00400000,OPT,2021-01-05,DIV,0,2,0,,,",
			"5,,EUR,CASH,2021-01-31,INT,0,0.42,0,,,",
			"6,US0378331005,AAPL,STK,2021-02-01,DIV,0,5,0,,,",
		]);

		assert_eq!(ids(&result), vec!["5", "6"]);
		assert!(result.ignored["CASH"].contains("EUR.USD"));
		assert!(result.ignored[FOREX_BUCKET].contains("GBP.USD"));
		assert_eq!(result.ignored["OPT"].len(), 1);
	}

	#[test]
	fn test_cancellation_pairs() {
		let result = load(&[
			"1,IE00B4L5Y983,EUNL,FUND,2021-01-10 10:00:00,BUY,10,-100,1,,,",
			"2,IE00B4L5Y983,EUNL,FUND,2021-01-10 11:00:00,BUY,10,-100,1,,,",
			"3,IE00B4L5Y983,EUNL,FUND,2021-01-11 09:00:00,BUY (Ca.),-10,100.03,0,,,",
			"4,IE00B4L5Y983,EUNL,FUND,2021-01-12 09:00:00,SELL,-5,60,1,,,Sale [CANCEL]",
		]);

		// The most recent matching buy is the one cancelled
		assert_eq!(ids(&result), vec!["1"]);
		assert_eq!(
			result.cancelled_pairs,
			vec![CancelledPair {
				original: "2".to_string(),
				cancellation: "3".to_string(),
			}]
		);
		assert_eq!(result.orphan_cancellations.len(), 1);
		assert_eq!(result.orphan_cancellations[0].id, "4");
	}

	#[test]
	fn test_cancellation_outside_tolerance() {
		let result = load(&[
			"1,IE00B4L5Y983,EUNL,FUND,2021-01-10,BUY,10,-100,1,,,",
			"2,IE00B4L5Y983,EUNL,FUND,2021-01-11,Ca.,-10,100.10,0,,,",
		]);

		assert_eq!(ids(&result), vec!["1"]);
		assert!(result.cancelled_pairs.is_empty());
		assert_eq!(result.orphan_cancellations[0].kind, TransactionKind::Sell);
	}

	#[test]
	fn test_bad_rows() {
		let file = csv_file(&["1,X,EUNL,FUND,2021-01-10,SWAP,10,-100,0,,,"]);
		let path = file.path().to_str().unwrap().to_string();
		let err = load_transactions(&[path.clone()]).unwrap_err();
		assert!(err.to_string().contains("row 2"));

		let file = csv_file(&[]);
		let path = file.path().to_str().unwrap().to_string();
		assert!(load_transactions(&[path.clone(), path]).is_err());
	}
}
