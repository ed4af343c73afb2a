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

use anyhow::{anyhow, Error};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;

/// A lot whose remaining quantity falls to or below this is considered fully
/// disposed and leaves its queue. Division by non-terminating ratios means a
/// lot sold in several pieces rarely lands on exactly zero.
pub const LOT_CLOSE_TOLERANCE: Decimal = dec!(0.000001);

/// Residual quantity of a sale below which the sale counts as fully allocated.
pub const ALLOCATION_TOLERANCE: Decimal = dec!(0.000001);

/// Parses decimal text exactly. Accepts plain and scientific notation and
/// tolerates surrounding whitespace; an empty field reads as zero.
pub fn parse_decimal(s: &str) -> Result<Decimal, Error> {
	let s = s.trim();
	if s.is_empty() {
		return Ok(Decimal::ZERO);
	}

	Decimal::from_str(s)
		.or_else(|_| Decimal::from_scientific(s))
		.map_err(|e| anyhow!("invalid decimal '{}': {}", s, e))
}

/// Rounds half away from zero to exactly `precision` decimal places, so the
/// value displays with trailing zeroes. Never yields a negative zero.
pub fn round_to(value: Decimal, precision: u32) -> Decimal {
	let mut rounded = value.round_dp_with_strategy(
		precision,
		RoundingStrategy::MidpointAwayFromZero,
	);
	if rounded.is_zero() {
		rounded = Decimal::ZERO;
	}
	rounded.rescale(precision);
	rounded
}

pub fn format_decimal(value: Decimal, precision: u32) -> String {
	round_to(value, precision).to_string()
}

/// Renders a rate such as 0.3 as "30%".
pub fn format_percent(rate: Decimal) -> String {
	format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_decimal() {
		assert_eq!(parse_decimal("12.50").unwrap(), dec!(12.50));
		assert_eq!(parse_decimal(" -3 ").unwrap(), dec!(-3));
		assert_eq!(parse_decimal("").unwrap(), Decimal::ZERO);
		assert_eq!(parse_decimal("1e-3").unwrap(), dec!(0.001));
		assert!(parse_decimal("abc").is_err());
	}

	#[test]
	fn test_parse_is_exact() {
		// would be 0.30000000000000004 through f64
		let sum = parse_decimal("0.1").unwrap() + parse_decimal("0.2").unwrap();
		assert_eq!(sum, dec!(0.3));
	}

	#[test]
	fn test_format_decimal() {
		assert_eq!(format_decimal(dec!(188), 2), "188.00");
		assert_eq!(format_decimal(dec!(7.005), 2), "7.01");
		assert_eq!(format_decimal(dec!(-7.005), 2), "-7.01");
		assert_eq!(format_decimal(dec!(-0.001), 2), "0.00");
		assert_eq!(format_decimal(dec!(1.23456), 0), "1");
	}

	#[test]
	fn test_format_percent() {
		assert_eq!(format_percent(dec!(0.30)), "30%");
		assert_eq!(format_percent(dec!(0.15)), "15%");
		assert_eq!(format_percent(dec!(0)), "0%");
	}
}
