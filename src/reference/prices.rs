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
use crate::reference::PriceLookup;
use crate::util::decimal::parse_decimal;
use anyhow::{anyhow, Error};
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Year-end market prices, in settlement currency, read from a CSV file with
/// the columns `year,isin,price`.
#[derive(Debug, Default)]
pub struct PriceTable {
	prices: BTreeMap<(i32, String), Decimal>,
}

#[derive(Deserialize)]
struct PriceRow {
	year: String,
	isin: String,
	#[serde(alias = "price_eur")]
	price: String,
}

impl PriceTable {
	pub fn new() -> Self {
		Default::default()
	}

	/// Loads prices from a file. A missing file yields an empty table: no
	/// deemed distribution can be computed, but the run goes on.
	pub fn load(path: &Path) -> Result<Self, Error> {
		if !path.exists() {
			warn!(
				"No price file at {}; deemed distributions cannot be computed",
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
		for (i, row) in reader.deserialize::<PriceRow>().enumerate() {
			let row = row?;
			// unparseable rows are skipped, as are blank trailing lines
			match (row.year.parse::<i32>(), parse_decimal(&row.price)) {
				(Ok(year), Ok(price)) => table.insert(&row.isin, year, price),
				_ => warn!("Skipping price row {}: {} {} {}", i + 2, row.year, row.isin, row.price),
			}
		}
		Ok(table)
	}

	pub fn insert(&mut self, isin: &str, year: i32, price: Decimal) {
		self.prices.insert((year, isin.to_string()), price);
	}

	pub fn len(&self) -> usize {
		self.prices.len()
	}
}

impl PriceLookup for PriceTable {
	fn year_end_price(&self, isin: &str, year: i32) -> Option<Decimal> {
		self.prices.get(&(year, isin.to_string())).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn table(csv: &str) -> PriceTable {
		let reader = csv::ReaderBuilder::new()
			.trim(csv::Trim::All)
			.from_reader(csv.as_bytes());
		PriceTable::from_reader(reader).unwrap()
	}

	#[test]
	fn test_lookup() {
		let prices = table("year,isin,price\n2021,IE00B4L5Y983,11\n2022,IE00B4L5Y983,12.345\n");
		assert_eq!(prices.len(), 2);
		assert_eq!(prices.year_end_price("IE00B4L5Y983", 2021), Some(dec!(11)));
		assert_eq!(prices.year_end_price("IE00B4L5Y983", 2022), Some(dec!(12.345)));
		assert_eq!(prices.year_end_price("IE00B4L5Y983", 2023), None);
		assert_eq!(prices.year_end_price("X", 2021), None);
	}

	#[test]
	fn test_legacy_header_and_bad_rows() {
		let prices = table("year,isin,price_eur\nabc,X,1\n2021,X,n/a\n2021,Y,5\n");
		assert_eq!(prices.len(), 1);
		assert_eq!(prices.year_end_price("Y", 2021), Some(dec!(5)));
	}

	#[test]
	fn test_load_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let prices = PriceTable::load(&dir.path().join("prices.csv")).unwrap();
		assert_eq!(prices.len(), 0);
	}
}
