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
use crate::reference::{BaseRateLookup, PriceLookup};
use crate::tax::distributions::DistributionTracker;
use crate::tax::event::TaxEvent;
use crate::tax::exemptions::ExemptionResolver;
use crate::tax::fault::{Fault, FaultLog};
use crate::tax::ledger::TaxLedger;
use crate::util::date::Date;
use log::{debug, info};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Share of the base rate that counts as the basic return.
pub const BASE_RATE_FACTOR: Decimal = dec!(0.7);

/// Per-share breakdown of one lot's deemed distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImputedYield {
	pub base_yield: Decimal,
	pub price_gain: Decimal,
	pub capped: Decimal,
	pub net: Decimal,
}

impl ImputedYield {
	/// The basic return on the lot's unit cost, pro-rated by months held,
	/// capped at the year's price gain and reduced by what was actually
	/// distributed per share. Never negative.
	pub fn compute(
		unit_cost: Decimal,
		base_rate: Decimal,
		months: u8,
		eoy_price: Decimal,
		distributed_per_share: Decimal,
	) -> Self {
		let base_yield =
			unit_cost * (base_rate * BASE_RATE_FACTOR) * (Decimal::from(months) / dec!(12));
		let price_gain = (eoy_price - unit_cost).max(Decimal::ZERO);
		let capped = base_yield.min(price_gain);
		let net = (capped - distributed_per_share).max(Decimal::ZERO);

		Self {
			base_yield,
			price_gain,
			capped,
			net,
		}
	}
}

/// Months of `year` a lot acquired on `acquired` counts as held. The month of
/// acquisition counts in full.
pub fn holding_months(acquired: Date, year: i32) -> u8 {
	if acquired.year() < year {
		12
	} else if acquired.year() == year {
		13 - acquired.month()
	} else {
		0
	}
}

/// Charges the deemed distribution on every open lot at the end of a year.
pub struct YearEndCloser<'a> {
	base_rates: &'a dyn BaseRateLookup,
	prices: &'a dyn PriceLookup,
}

impl<'a> YearEndCloser<'a> {
	pub fn new(base_rates: &'a dyn BaseRateLookup, prices: &'a dyn PriceLookup) -> Self {
		Self { base_rates, prices }
	}

	/// Appends one deemed distribution event per charged lot and adds the
	/// charge to the lot's pending offset. Instruments without a year-end
	/// price are skipped and recorded. Returns the number of events appended.
	pub fn close(
		&self,
		year: i32,
		portfolio: &mut Portfolio,
		distributions: &DistributionTracker,
		exemptions: &mut ExemptionResolver,
		ledger: &mut TaxLedger,
		faults: &mut FaultLog,
	) -> usize {
		let base_rate = match self.base_rates.base_rate(year) {
			Some(rate) => rate,
			None => {
				if !portfolio.is_empty() {
					faults.record(Fault::MissingBaseRate { year });
				}
				Decimal::ZERO
			},
		};

		if base_rate <= Decimal::ZERO {
			info!("{}: base rate {}, no deemed distributions", year, base_rate);
			return 0;
		}

		let mut charged = 0;
		for (isin, queue) in portfolio.queues_mut() {
			let open_quantity: Decimal = queue
				.iter()
				.filter(|lot| lot.is_open())
				.map(|lot| lot.remaining_quantity)
				.sum();
			if open_quantity.is_zero() {
				continue;
			}

			let Some(eoy_price) = self.prices.year_end_price(isin, year) else {
				faults.record(Fault::MissingYearEndPrice {
					isin: isin.clone(),
					year,
					open_quantity,
				});
				continue;
			};

			let distributed = distributions.per_share(year, isin);
			let symbol = queue.front().map(|lot| lot.symbol.clone()).unwrap_or_default();
			let exemption_rate = exemptions.rate(isin, &symbol, faults);

			for lot in queue.iter_mut().filter(|lot| lot.is_open()) {
				let months = holding_months(lot.acquisition_date, year);
				let imputed = ImputedYield::compute(
					lot.unit_cost(),
					base_rate,
					months,
					eoy_price,
					distributed,
				);

				let total = imputed.net * lot.remaining_quantity;
				if total <= Decimal::ZERO {
					continue;
				}

				debug!(
					"[VAP] {} lot {}: {} x {} ({} months, base {}, gain {})",
					isin,
					lot.id,
					lot.remaining_quantity,
					imputed.net,
					months,
					imputed.base_yield,
					imputed.price_gain
				);

				lot.accumulated_offset += total;
				ledger.append(TaxEvent::deemed_distribution(
					year,
					isin,
					&lot.symbol,
					&lot.id,
					lot.remaining_quantity,
					total,
					exemption_rate,
				));
				charged += 1;
			}
		}

		info!("{}: closed with {} deemed distributions", year, charged);
		charged
	}
}
