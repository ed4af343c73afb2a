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
use crate::util::date::Date;
use anyhow::{bail, Error};
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;

/// One record of the pre-converted transaction stream. All money fields are
/// already in the settlement currency; `fx_rate` and `price_origin` survive
/// only for audit output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
	pub id: String,
	pub isin: String,
	pub symbol: String,
	pub timestamp: NaiveDateTime,
	pub kind: TransactionKind,

	/// Signed as exported: buys positive, sells usually negative
	pub quantity: Decimal,
	/// Trade notional or cash amount; sells and withholding usually negative
	pub amount: Decimal,
	pub fees: Decimal,

	pub fx_rate: Decimal,
	pub price_origin: Decimal,
}

impl Transaction {
	pub fn date(&self) -> Date {
		Date::from(self.timestamp.date())
	}

	pub fn year(&self) -> i32 {
		self.timestamp.year()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionKind {
	Buy,
	Sell,
	/// Cash distribution paid by the instrument
	Dividend,
	/// Foreign tax withheld at source on a distribution
	WithholdingTax,
	Interest,
}

impl TransactionKind {
	pub fn parse(s: &str) -> Result<Self, Error> {
		match s.trim().to_ascii_uppercase().as_str() {
			"BUY" => Ok(TransactionKind::Buy),
			"SELL" => Ok(TransactionKind::Sell),
			"DIV" | "DIVIDEND" => Ok(TransactionKind::Dividend),
			"WHT" => Ok(TransactionKind::WithholdingTax),
			"INT" | "INTEREST" => Ok(TransactionKind::Interest),
			other => bail!("unknown transaction kind: {}", other),
		}
	}

	pub fn is_trade(&self) -> bool {
		matches!(self, TransactionKind::Buy | TransactionKind::Sell)
	}
}

impl fmt::Display for TransactionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransactionKind::Buy => "BUY",
			TransactionKind::Sell => "SELL",
			TransactionKind::Dividend => "DIV",
			TransactionKind::WithholdingTax => "WHT",
			TransactionKind::Interest => "INT",
		};
		write!(f, "{}", s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_kind() {
		assert_eq!(TransactionKind::parse("buy").unwrap(), TransactionKind::Buy);
		assert_eq!(
			TransactionKind::parse(" DIV ").unwrap(),
			TransactionKind::Dividend
		);
		assert_eq!(
			TransactionKind::parse("WHT").unwrap(),
			TransactionKind::WithholdingTax
		);
		assert!(TransactionKind::parse("SPLIT").is_err());
	}

	#[test]
	fn test_trade_kinds() {
		assert!(TransactionKind::Buy.is_trade());
		assert!(TransactionKind::Sell.is_trade());
		assert!(!TransactionKind::Dividend.is_trade());
		assert!(!TransactionKind::Interest.is_trade());
	}
}
