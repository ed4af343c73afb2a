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
use crate::investment::lot::TaxLot;
use crate::reports::table::Table;
use crate::util::date::Date;
use crate::util::decimal::format_decimal;

/// Lists the lots still open, oldest first.
pub struct LotReporter<'a> {
	lots: Vec<&'a TaxLot>,
	precision: u32,
}

impl<'a> LotReporter<'a> {
	pub fn new(lots: Vec<&'a TaxLot>, precision: u32) -> Self {
		Self { lots, precision }
	}

	/// `as_of` is the date holding periods are measured to.
	pub fn render(&self, as_of: &Date) -> String {
		if self.lots.is_empty() {
			return "No open lots\n".to_string();
		}

		let mut table = Table::new(8);
		table.right_align(vec![2, 5, 6, 7]);
		table.add_header(vec![
			"ID",
			"Acquired",
			"Held",
			"ISIN",
			"Symbol",
			"Remaining",
			"Unit cost",
			"Pending offset",
		]);
		table.add_separator();

		for lot in &self.lots {
			table.add_row(vec![
				lot.id.clone(),
				lot.acquisition_date.to_string(),
				lot.time_held(as_of).to_string(),
				lot.isin.clone(),
				lot.symbol.clone(),
				lot.remaining_quantity.normalize().to_string(),
				format_decimal(lot.unit_cost(), self.precision),
				format_decimal(lot.accumulated_offset, self.precision),
			]);
		}

		table.render()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::investment::lot::Acquisition;
	use rust_decimal::Decimal;
	use rust_decimal_macros::dec;

	#[test]
	fn test_render_lots() {
		let mut lot = TaxLot::open(&Acquisition {
			id: "B1".to_string(),
			isin: "IE00B4L5Y983".to_string(),
			symbol: "EUNL".to_string(),
			date: Date::parse("2021-01-10").unwrap(),
			quantity: dec!(100),
			notional: dec!(1000),
			fees: dec!(2.5),
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		});
		lot.remaining_quantity = dec!(40.50);
		lot.accumulated_offset = dec!(2.835);

		let reporter = LotReporter::new(vec![&lot], 2);
		let out = reporter.render(&Date::parse("2021-12-31").unwrap());
		assert!(out.contains(
			"B1   2021-01-10   11m 21d   IE00B4L5Y983   EUNL          40.5       10.03             2.84"
		));

		let empty = LotReporter::new(vec![], 2);
		assert_eq!(empty.render(&Date::first_of_year(2022)), "No open lots\n");
	}
}
