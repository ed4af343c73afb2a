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
use crate::investment::instrument::{Instrument, DEFAULT_EXEMPTION_RATE};
use rust_decimal::Decimal;

pub mod base_rates;
pub mod instruments;
pub mod prices;

/// isin -> classification, plus the exemption rate for anything unclassified.
pub trait InstrumentDirectory {
	fn find(&self, isin: &str) -> Option<&Instrument>;

	fn default_exemption_rate(&self) -> Decimal {
		DEFAULT_EXEMPTION_RATE
	}
}

/// (isin, year) -> market price at the end of that year.
pub trait PriceLookup {
	fn year_end_price(&self, isin: &str, year: i32) -> Option<Decimal>;
}

/// year -> statutory base interest rate, as a fraction.
pub trait BaseRateLookup {
	fn base_rate(&self, year: i32) -> Option<Decimal>;
}
