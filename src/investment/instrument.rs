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
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt::Formatter;

/// Exemption rate assumed for an instrument nobody classified: the equity
/// fund rate, the most common case for a fund portfolio.
pub const DEFAULT_EXEMPTION_RATE: Decimal = dec!(0.30);

/// Reference data for one security. The exemption rate is the fraction of
/// any gain or distribution that is exempt from tax, by fund category
/// (0 for bonds and single stocks, 0.15 mixed funds, 0.30 equity funds,
/// 0.60/0.80 real estate funds).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Instrument {
	#[serde(default)]
	pub isin: String,

	#[serde(default)]
	pub symbol: String,

	#[serde(default)]
	pub name: String,

	#[serde(alias = "tfs_quote", default = "default_exemption_rate")]
	pub exemption_rate: Decimal,
}

fn default_exemption_rate() -> Decimal {
	DEFAULT_EXEMPTION_RATE
}

impl Instrument {
	#[cfg(test)]
	pub fn new(isin: &str, symbol: &str, name: &str, exemption_rate: Decimal) -> Self {
		Self {
			isin: isin.to_string(),
			symbol: symbol.to_string(),
			name: name.to_string(),
			exemption_rate,
		}
	}
}

impl std::fmt::Display for Instrument {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} ({}) {} {{ exempt {} }}",
			self.symbol, self.isin, self.name, self.exemption_rate
		)
	}
}
