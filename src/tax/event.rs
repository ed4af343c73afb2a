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
use crate::investment::sale::{Allocation, Disposal};
use crate::util::date::Date;
use anyhow::{anyhow, Error};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
	#[serde(rename = "SELL")]
	Sell,
	#[serde(rename = "DIV")]
	Dividend,
	#[serde(rename = "WHT")]
	WithholdingTax,
	/// Deemed minimum distribution on fund holdings
	#[serde(rename = "VAP")]
	DeemedDistribution,
	#[serde(rename = "INT")]
	Interest,
}

impl EventKind {
	pub const ALL: [EventKind; 5] = [
		EventKind::Sell,
		EventKind::DeemedDistribution,
		EventKind::Dividend,
		EventKind::Interest,
		EventKind::WithholdingTax,
	];

	/// Looks a kind up by its code, e.g. "VAP".
	pub fn parse(s: &str) -> Result<Self, Error> {
		let code = s.trim().to_ascii_uppercase();
		EventKind::ALL
			.into_iter()
			.find(|kind| kind.code() == code)
			.ok_or_else(|| anyhow!("unknown event kind: {}", s))
	}

	pub fn code(&self) -> &'static str {
		match self {
			EventKind::Sell => "SELL",
			EventKind::Dividend => "DIV",
			EventKind::WithholdingTax => "WHT",
			EventKind::DeemedDistribution => "VAP",
			EventKind::Interest => "INT",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

/// One taxable occurrence. Created once and never changed; the ledger only
/// ever appends them.
///
/// `year` is the tax year the event counts towards, which for deemed
/// distributions is the year after the data it was computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaxEvent {
	pub year: i32,
	pub date: Date,
	pub kind: EventKind,
	pub isin: String,
	pub symbol: String,

	pub quantity: Decimal,
	pub proceeds: Decimal,
	pub sale_costs: Decimal,
	pub acquisition_cost: Decimal,
	pub offset_used: Decimal,

	pub raw_profit: Decimal,
	pub taxable_profit: Decimal,
	pub exemption_rate: Decimal,

	/// Foreign tax paid, as a positive credit
	pub withholding_credit: Decimal,

	pub lot_id: Option<String>,
	pub date_acquired: Option<Date>,
	pub buy_price_origin: Decimal,
	pub buy_fx: Decimal,
	pub sell_price_origin: Decimal,
	pub sell_fx: Decimal,
}

impl TaxEvent {
	fn blank(
		kind: EventKind,
		date: Date,
		isin: &str,
		symbol: &str,
		exemption_rate: Decimal,
	) -> Self {
		Self {
			year: date.year(),
			date,
			kind,
			isin: isin.to_string(),
			symbol: symbol.to_string(),
			quantity: Decimal::ZERO,
			proceeds: Decimal::ZERO,
			sale_costs: Decimal::ZERO,
			acquisition_cost: Decimal::ZERO,
			offset_used: Decimal::ZERO,
			raw_profit: Decimal::ZERO,
			taxable_profit: Decimal::ZERO,
			exemption_rate,
			withholding_credit: Decimal::ZERO,
			lot_id: None,
			date_acquired: None,
			buy_price_origin: Decimal::ZERO,
			buy_fx: Decimal::ZERO,
			sell_price_origin: Decimal::ZERO,
			sell_fx: Decimal::ZERO,
		}
	}

	/// A realised gain or loss on the part of a disposal matched to one lot.
	pub fn sale(
		disposal: &Disposal,
		allocation: &Allocation,
		exemption_rate: Decimal,
	) -> Self {
		let raw_profit = allocation.raw_profit();
		Self {
			quantity: allocation.quantity,
			proceeds: allocation.proceeds,
			sale_costs: allocation.fees,
			acquisition_cost: allocation.acquisition_cost,
			offset_used: allocation.offset_used,
			raw_profit,
			taxable_profit: taxable(raw_profit, exemption_rate),
			lot_id: Some(allocation.lot_id.clone()),
			date_acquired: Some(allocation.acquisition_date),
			buy_price_origin: allocation.acquisition_price_origin,
			buy_fx: allocation.acquisition_fx_rate,
			sell_price_origin: disposal.price_origin,
			sell_fx: disposal.fx_rate,
			..Self::blank(
				EventKind::Sell,
				disposal.date,
				&disposal.isin,
				&disposal.symbol,
				exemption_rate,
			)
		}
	}

	pub fn dividend(
		date: Date,
		isin: &str,
		symbol: &str,
		gross: Decimal,
		exemption_rate: Decimal,
	) -> Self {
		Self {
			raw_profit: gross,
			taxable_profit: taxable(gross, exemption_rate),
			..Self::blank(EventKind::Dividend, date, isin, symbol, exemption_rate)
		}
	}

	/// Withholding never enters profit arithmetic; it is carried only as a
	/// credit.
	pub fn withholding(date: Date, isin: &str, symbol: &str, paid: Decimal) -> Self {
		Self {
			withholding_credit: paid.abs(),
			..Self::blank(
				EventKind::WithholdingTax,
				date,
				isin,
				symbol,
				Decimal::ZERO,
			)
		}
	}

	pub fn interest(date: Date, isin: &str, symbol: &str, amount: Decimal) -> Self {
		Self {
			raw_profit: amount,
			taxable_profit: amount,
			..Self::blank(EventKind::Interest, date, isin, symbol, Decimal::ZERO)
		}
	}

	/// The deemed distribution computed when closing `closing_year`. It is
	/// always dated January 1 of the following year.
	pub fn deemed_distribution(
		closing_year: i32,
		isin: &str,
		symbol: &str,
		lot_id: &str,
		quantity: Decimal,
		total: Decimal,
		exemption_rate: Decimal,
	) -> Self {
		Self {
			quantity,
			raw_profit: total,
			taxable_profit: taxable(total, exemption_rate),
			lot_id: Some(lot_id.to_string()),
			..Self::blank(
				EventKind::DeemedDistribution,
				Date::first_of_year(closing_year + 1),
				isin,
				symbol,
				exemption_rate,
			)
		}
	}
}

/// Partial exemption is always multiplicative.
fn taxable(raw: Decimal, exemption_rate: Decimal) -> Decimal {
	raw * (Decimal::ONE - exemption_rate)
}
