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
use crate::tax::event::{EventKind, TaxEvent};
use crate::tax::ledger::TaxLedger;
use crate::util::decimal::round_to;
use anyhow::Error;
use std::io::Write;
use std::ops::RangeInclusive;

/// Writes ledger events as CSV, one row per event in ledger order. Money
/// columns are rounded to `precision`; quantities, rates and audit prices are
/// written as held.
pub fn write_events<W: Write>(
	writer: W,
	ledger: &TaxLedger,
	years: RangeInclusive<i32>,
	kind: Option<EventKind>,
	precision: u32,
) -> Result<usize, Error> {
	let mut csv_writer = csv::Writer::from_writer(writer);

	let mut written = 0;
	for event in ledger.query(None, kind).filter(|e| years.contains(&e.year)) {
		csv_writer.serialize(rounded(event, precision))?;
		written += 1;
	}

	csv_writer.flush()?;
	Ok(written)
}

fn rounded(event: &TaxEvent, precision: u32) -> TaxEvent {
	let round = |value| round_to(value, precision);
	TaxEvent {
		quantity: event.quantity.normalize(),
		proceeds: round(event.proceeds),
		sale_costs: round(event.sale_costs),
		acquisition_cost: round(event.acquisition_cost),
		offset_used: round(event.offset_used),
		raw_profit: round(event.raw_profit),
		taxable_profit: round(event.taxable_profit),
		exemption_rate: event.exemption_rate.normalize(),
		withholding_credit: round(event.withholding_credit),
		buy_price_origin: event.buy_price_origin.normalize(),
		buy_fx: event.buy_fx.normalize(),
		sell_price_origin: event.sell_price_origin.normalize(),
		sell_fx: event.sell_fx.normalize(),
		..event.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::util::date::Date;
	use rust_decimal_macros::dec;

	#[test]
	fn test_write_events() {
		let mut ledger = TaxLedger::new();
		ledger.append(TaxEvent::deemed_distribution(
			2021,
			"IE00B4L5Y983",
			"EUNL",
			"B1",
			dec!(100),
			dec!(7),
			dec!(0.3),
		));
		ledger.append(TaxEvent::withholding(
			Date::parse("2022-06-15").unwrap(),
			"US0378331005",
			"AAPL",
			dec!(-0.455),
		));
		ledger.append(TaxEvent::interest(
			Date::parse("2023-01-31").unwrap(),
			"",
			"EUR",
			dec!(1),
		));

		let mut out = Vec::new();
		let written = write_events(&mut out, &ledger, 2022..=2022, None, 2).unwrap();
		assert_eq!(written, 2);

		let text = String::from_utf8(out).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("year,date,kind,isin,symbol,quantity,proceeds"));
		assert!(lines[1].starts_with("2022,2022-01-01,VAP,IE00B4L5Y983,EUNL,100,0.00,"));
		assert!(lines[1].contains(",7.00,4.90,0.3,0.00,B1,,"));
		assert!(lines[2].contains(",WHT,"));
		assert!(lines[2].contains(",0.00,0.00,0,0.46,,,"));

		let mut out = Vec::new();
		let written =
			write_events(&mut out, &ledger, 2020..=2030, Some(EventKind::Interest), 2).unwrap();
		assert_eq!(written, 1);
	}
}
