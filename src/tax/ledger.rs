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
use rust_decimal::Decimal;

/// Append-only record of every tax event, in the order produced. External
/// reporting reads it by year and kind; nothing removes or edits an event.
#[derive(Debug, Default)]
pub struct TaxLedger {
	events: Vec<TaxEvent>,
}

impl TaxLedger {
	pub fn new() -> Self {
		Default::default()
	}

	pub(crate) fn append(&mut self, event: TaxEvent) {
		self.events.push(event);
	}

	pub fn events(&self) -> &[TaxEvent] {
		&self.events
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	/// Events counting towards a tax year, optionally narrowed to one kind.
	pub fn query(
		&self,
		year: Option<i32>,
		kind: Option<EventKind>,
	) -> impl Iterator<Item = &TaxEvent> {
		self.events.iter().filter(move |e| {
			year.map_or(true, |y| e.year == y) && kind.map_or(true, |k| e.kind == k)
		})
	}

	pub fn summarize(&self, year: i32) -> YearSummary {
		let taxable = |kind| -> Decimal {
			self.query(Some(year), Some(kind))
				.map(|e| e.taxable_profit)
				.sum()
		};

		YearSummary {
			year,
			disposals: taxable(EventKind::Sell),
			deemed_distributions: taxable(EventKind::DeemedDistribution),
			dividends: taxable(EventKind::Dividend),
			interest: taxable(EventKind::Interest),
			withholding_credit: self
				.query(Some(year), None)
				.map(|e| e.withholding_credit)
				.sum(),
		}
	}
}

/// Taxable totals of one year, by income category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearSummary {
	pub year: i32,
	pub disposals: Decimal,
	pub deemed_distributions: Decimal,
	pub dividends: Decimal,
	pub interest: Decimal,
	pub withholding_credit: Decimal,
}

impl YearSummary {
	pub fn other_income(&self) -> Decimal {
		self.deemed_distributions + self.dividends + self.interest
	}

	pub fn total_income(&self) -> Decimal {
		self.disposals + self.other_income()
	}

	/// Flat-rate tax with surcharge on the total, before withholding credit.
	pub fn estimated_tax(&self, flat_rate: Decimal, surcharge_rate: Decimal) -> Decimal {
		self.total_income() * flat_rate * (Decimal::ONE + surcharge_rate)
	}

	pub fn estimated_balance(&self, flat_rate: Decimal, surcharge_rate: Decimal) -> Decimal {
		self.estimated_tax(flat_rate, surcharge_rate) - self.withholding_credit
	}
}
