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
use crate::reference::BaseRateLookup;
use crate::util::decimal::parse_decimal;
use anyhow::{anyhow, Error};
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Statutory base interest rates by year, read from a CSV file with the
/// columns `year,rate`. Rates are fractions: 2.55% is `0.0255`.
#[derive(Debug, Default)]
pub struct BaseRateTable {
	rates: BTreeMap<i32, Decimal>,
}

#[derive(Deserialize)]
struct RateRow {
	year: String,
	rate: String,
}

impl BaseRateTable {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn load(path: &Path) -> Result<Self, Error> {
		if !path.exists() {
			warn!(
				"No base rate file at {}; every year is treated as a zero-rate year",
				path.display()
			);
			return Ok(Self::new());
		}

		let reader = csv::ReaderBuilder::new()
			.trim(csv::Trim::All)
			.from_path(path)
			.map_err(|e| anyhow!("{}: {}", path.display(), e))?;
		Self::from_reader(reader)
	}

	pub fn from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, Error> {
		let mut table = Self::new();
		for (i, row) in reader.deserialize::<RateRow>().enumerate() {
			let row = row?;
			match (row.year.parse::<i32>(), parse_decimal(&row.rate)) {
				(Ok(year), Ok(rate)) => table.insert(year, rate),
				_ => warn!("Skipping base rate row {}: {} {}", i + 2, row.year, row.rate),
			}
		}
		Ok(table)
	}

	pub fn insert(&mut self, year: i32, rate: Decimal) {
		self.rates.insert(year, rate);
	}

	pub fn len(&self) -> usize {
		self.rates.len()
	}
}

impl BaseRateLookup for BaseRateTable {
	fn base_rate(&self, year: i32) -> Option<Decimal> {
		self.rates.get(&year).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_lookup() {
		let csv = "year,rate\n2021,-0.0045\n2023,0.0255\n2024,0.0229\n";
		let reader = csv::Reader::from_reader(csv.as_bytes());
		let rates = BaseRateTable::from_reader(reader).unwrap();

		assert_eq!(rates.len(), 3);
		assert_eq!(rates.base_rate(2021), Some(dec!(-0.0045)));
		assert_eq!(rates.base_rate(2023), Some(dec!(0.0255)));
		assert_eq!(rates.base_rate(2022), None);
	}

	#[test]
	fn test_load_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("rates.csv");
		std::fs::write(&path, "year , rate\n2024 , 0.0229\n").unwrap();
		let rates = BaseRateTable::load(&path).unwrap();
		assert_eq!(rates.base_rate(2024), Some(dec!(0.0229)));
	}
}
