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
use crate::investment::portfolio::Portfolio;
use crate::util::date::Date;
use log::trace;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Decides how many units a cash distribution is spread over.
pub trait AttributionPolicy {
	fn attributable_quantity(&self, portfolio: &Portfolio, isin: &str, date: Date) -> Decimal;

	fn name(&self) -> &'static str;
}

/// Spreads a distribution over whatever is open when it is processed,
/// rather than over what was held on its record date. Sales between record
/// date and payment skew the per-share figure; the stream carries no record
/// dates to do better.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenQuantityAtProcessing;

impl AttributionPolicy for OpenQuantityAtProcessing {
	fn attributable_quantity(&self, portfolio: &Portfolio, isin: &str, _date: Date) -> Decimal {
		portfolio.open_quantity(isin)
	}

	fn name(&self) -> &'static str {
		"open quantity at processing time"
	}
}

/// Per-share cash distributions accumulated per (year, isin). Keys are
/// year-scoped, so a new year starts from zero without any reset.
#[derive(Debug, Default)]
pub struct DistributionTracker {
	per_share: BTreeMap<(i32, String), Decimal>,
}

impl DistributionTracker {
	pub fn new() -> Self {
		Default::default()
	}

	/// Adds a distribution spread over `quantity` units. Returns the per-share
	/// amount added, or None if there is nothing to spread it over.
	pub fn record(
		&mut self,
		year: i32,
		isin: &str,
		amount: Decimal,
		quantity: Decimal,
	) -> Option<Decimal> {
		if quantity <= Decimal::ZERO {
			return None;
		}

		let per_share = amount / quantity;
		*self
			.per_share
			.entry((year, isin.to_string()))
			.or_insert(Decimal::ZERO) += per_share;

		trace!("[DIST] {} {}: +{} per share", year, isin, per_share);
		Some(per_share)
	}

	pub fn per_share(&self, year: i32, isin: &str) -> Decimal {
		self.per_share
			.get(&(year, isin.to_string()))
			.copied()
			.unwrap_or(Decimal::ZERO)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::investment::lot::Acquisition;
	use rust_decimal_macros::dec;

	#[test]
	fn test_accumulates_within_year() {
		let mut tracker = DistributionTracker::new();
		assert_eq!(tracker.record(2022, "X", dec!(50), dec!(100)), Some(dec!(0.5)));
		assert_eq!(tracker.record(2022, "X", dec!(25), dec!(50)), Some(dec!(0.5)));
		assert_eq!(tracker.per_share(2022, "X"), dec!(1.0));
	}

	#[test]
	fn test_years_are_separate() {
		let mut tracker = DistributionTracker::new();
		tracker.record(2022, "X", dec!(50), dec!(100));
		assert!(tracker.per_share(2023, "X").is_zero());
		assert!(tracker.per_share(2022, "Y").is_zero());
	}

	#[test]
	fn test_zero_quantity_is_dropped() {
		let mut tracker = DistributionTracker::new();
		assert_eq!(tracker.record(2022, "X", dec!(50), Decimal::ZERO), None);
		assert!(tracker.per_share(2022, "X").is_zero());
	}

	#[test]
	fn test_policy_reads_open_quantity() {
		let mut portfolio = Portfolio::new();
		let date = Date::parse("2022-01-03").unwrap();
		portfolio.buy_lot(&Acquisition {
			id: "1".to_string(),
			isin: "X".to_string(),
			symbol: "X".to_string(),
			date,
			quantity: dec!(40),
			notional: dec!(400),
			fees: Decimal::ZERO,
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		});

		let policy = OpenQuantityAtProcessing;
		assert_eq!(policy.attributable_quantity(&portfolio, "X", date), dec!(40));
		assert!(policy.attributable_quantity(&portfolio, "Y", date).is_zero());
	}
}
