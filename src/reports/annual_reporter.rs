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
use crate::config::config_file::TaxSettings;
use crate::reports::table::Table;
use crate::tax::event::{EventKind, TaxEvent};
use crate::tax::ledger::TaxLedger;
use crate::util::decimal::{format_decimal, format_percent};
use rust_decimal::Decimal;
use std::ops::RangeInclusive;

/// Prints the per-year tax statement: one section per event kind, followed by
/// the income summary and the estimated tax.
pub struct AnnualReporter<'a> {
	ledger: &'a TaxLedger,
	settings: &'a TaxSettings,
	precision: u32,
}

impl<'a> AnnualReporter<'a> {
	pub fn new(ledger: &'a TaxLedger, settings: &'a TaxSettings, precision: u32) -> Self {
		Self {
			ledger,
			settings,
			precision,
		}
	}

	pub fn print(&self, years: RangeInclusive<i32>) {
		let statements: Vec<String> = years.map(|year| self.render(year)).collect();
		print!("{}", statements.join("\n"));
	}

	pub fn render(&self, year: i32) -> String {
		let events: Vec<&TaxEvent> = self.ledger.query(Some(year), None).collect();
		if events.is_empty() {
			return format!("{}: no taxable events\n", year);
		}

		let title = format!("Tax year {}", year);
		let mut out = format!("{}\n{}\n", title, "=".repeat(title.len()));

		let of_kind = |kind: EventKind| {
			events
				.iter()
				.copied()
				.filter(move |e| e.kind == kind)
				.collect::<Vec<_>>()
		};

		let sections = [
			("Disposals", EventKind::Sell),
			("Deemed distributions", EventKind::DeemedDistribution),
			("Dividends", EventKind::Dividend),
			("Interest", EventKind::Interest),
			("Withholding credits", EventKind::WithholdingTax),
		];
		for (heading, kind) in sections {
			let section = of_kind(kind);
			if section.is_empty() {
				continue;
			}
			out.push('\n');
			out.push_str(heading);
			out.push('\n');
			out.push_str(&self.section_table(kind, &section).render());
		}

		out.push_str("\nSummary\n");
		out.push_str(&self.summary_table(year).render());
		out
	}

	fn amount(&self, value: Decimal) -> String {
		format_decimal(value, self.precision)
	}

	fn section_table(&self, kind: EventKind, events: &[&TaxEvent]) -> Table {
		let (header, total_col): (Vec<&str>, usize) = match kind {
			EventKind::Sell => (
				vec!["Date", "Symbol", "Qty", "Held", "Exempt", "Raw", "Offset", "Taxable"],
				7,
			),
			EventKind::DeemedDistribution => (
				vec!["Date", "Symbol", "Lot", "Qty", "Exempt", "Raw", "Taxable"],
				6,
			),
			EventKind::Dividend => (vec!["Date", "Symbol", "Exempt", "Gross", "Taxable"], 4),
			EventKind::Interest => (vec!["Date", "Symbol", "Amount"], 2),
			EventKind::WithholdingTax => (vec!["Date", "Symbol", "Credit"], 2),
		};

		let mut table = Table::new(header.len());
		table.right_align((2..header.len()).collect());
		table.add_header(header);
		table.add_separator();

		let mut total = Decimal::ZERO;
		for e in events {
			let date = e.date.to_string();
			let symbol = e.symbol.clone();
			let row = match kind {
				EventKind::Sell => vec![
					date,
					symbol,
					e.quantity.normalize().to_string(),
					e.date_acquired
						.map(|acquired| acquired.until(&e.date).to_string())
						.unwrap_or_default(),
					format_percent(e.exemption_rate),
					self.amount(e.raw_profit),
					self.amount(e.offset_used),
					self.amount(e.taxable_profit),
				],
				EventKind::DeemedDistribution => vec![
					date,
					symbol,
					e.lot_id.clone().unwrap_or_default(),
					e.quantity.normalize().to_string(),
					format_percent(e.exemption_rate),
					self.amount(e.raw_profit),
					self.amount(e.taxable_profit),
				],
				EventKind::Dividend => vec![
					date,
					symbol,
					format_percent(e.exemption_rate),
					self.amount(e.raw_profit),
					self.amount(e.taxable_profit),
				],
				EventKind::Interest => vec![date, symbol, self.amount(e.taxable_profit)],
				EventKind::WithholdingTax => {
					vec![date, symbol, self.amount(e.withholding_credit)]
				},
			};
			total += match kind {
				EventKind::WithholdingTax => e.withholding_credit,
				_ => e.taxable_profit,
			};
			table.add_row(row);
		}

		if events.len() > 1 {
			table.add_partial_separator(vec![total_col]);
			let mut row = vec![String::new(); total_col];
			row.push(self.amount(total));
			table.add_row(row);
		}
		table
	}

	fn summary_table(&self, year: i32) -> Table {
		let summary = self.ledger.summarize(year);
		let flat = self.settings.flat_rate;
		let surcharge = self.settings.surcharge_rate;
		let effective_rate = flat * (Decimal::ONE + surcharge);

		let mut table = Table::new(2);
		table.right_align(vec![1]);

		let lines = [
			("Disposals".to_string(), summary.disposals),
			("Other income".to_string(), summary.other_income()),
			("Total taxable income".to_string(), summary.total_income()),
			(
				format!("Estimated tax ({})", format_percent(effective_rate)),
				summary.estimated_tax(flat, surcharge),
			),
			("Withholding credit".to_string(), summary.withholding_credit),
			(
				"Estimated balance".to_string(),
				summary.estimated_balance(flat, surcharge),
			),
		];
		for (label, value) in lines {
			table.add_row(vec![label, self.amount(value)]);
		}
		table
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::investment::lot::Acquisition;
	use crate::investment::portfolio::Portfolio;
	use crate::investment::sale::Disposal;
	use crate::util::date::Date;
	use rust_decimal_macros::dec;

	fn ledger() -> TaxLedger {
		let mut portfolio = Portfolio::new();
		portfolio.buy_lot(&Acquisition {
			id: "B1".to_string(),
			isin: "IE00B4L5Y983".to_string(),
			symbol: "EUNL".to_string(),
			date: Date::parse("2021-01-10").unwrap(),
			quantity: dec!(100),
			notional: dec!(1000),
			fees: Decimal::ZERO,
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		});
		let disposal = Disposal {
			isin: "IE00B4L5Y983".to_string(),
			symbol: "EUNL".to_string(),
			date: Date::parse("2022-03-01").unwrap(),
			quantity: dec!(100),
			proceeds: dec!(1200),
			fees: dec!(5),
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		};
		let outcome = portfolio.sell_lot(&disposal);

		let mut ledger = TaxLedger::new();
		ledger.append(TaxEvent::sale(&disposal, &outcome.allocations[0], dec!(0.3)));
		ledger.append(TaxEvent::interest(
			Date::parse("2022-12-31").unwrap(),
			"",
			"EUR",
			dec!(10),
		));
		ledger
	}

	#[test]
	fn test_render_year() {
		let ledger = ledger();
		let settings = TaxSettings::default();
		let reporter = AnnualReporter::new(&ledger, &settings, 2);

		let out = reporter.render(2022);
		assert!(out.starts_with("Tax year 2022\n=============\n"));
		assert!(out.contains("\nDisposals\n"));
		assert!(out.contains("\nInterest\n"));
		assert!(!out.contains("Dividends"));
		assert!(out.contains("2022-03-01   EUNL     100   1y 1m 22d"));
		// 195 * 0.7 + 10
		assert!(out.contains("Total taxable income      146.50"));
		assert!(out.contains("Estimated tax (26.375%)"));

		assert_eq!(reporter.render(2023), "2023: no taxable events\n");
	}
}
