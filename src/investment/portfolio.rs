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
use crate::investment::lot::{Acquisition, TaxLot};
use crate::investment::sale::{Allocation, Disposal, SaleOutcome, Shortfall};
use crate::util::decimal::ALLOCATION_TOLERANCE;
use log::{debug, trace};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

/// The lot inventory: one FIFO queue of open lots per isin. It is the only
/// owner of lots; sales and year-end closes reach them through here rather
/// than holding copies.
///
/// Queues are kept in isin order so that anything walking the whole
/// inventory (year-end closing, reports) is deterministic.
#[derive(Debug, Default)]
pub struct Portfolio {
	queues: BTreeMap<String, VecDeque<TaxLot>>,
	/// The ID number that will be automatically assigned to the next lot
	/// bought without a transaction id
	next_id: u64,
}

impl Portfolio {
	pub fn new() -> Self {
		Default::default()
	}

	/// Appends a new lot to the tail of the instrument's queue.
	pub fn buy_lot(&mut self, acquisition: &Acquisition) -> &TaxLot {
		let mut lot = TaxLot::open(acquisition);
		if lot.id.is_empty() {
			self.next_id += 1;
			lot.id = self.next_id.to_string();
		}

		trace!(
			"[BUY] {} {} as lot {} at cost {}",
			lot.original_quantity,
			lot.symbol,
			lot.id,
			lot.total_cost
		);

		let queue = self.queues.entry(lot.isin.clone()).or_default();
		queue.push_back(lot);
		&queue[queue.len() - 1]
	}

	/// Matches a disposal against the instrument's lots, oldest first.
	/// Proceeds and fees are split by the share of the disposal each take
	/// represents; cost basis by the lot's unit cost; the pending offset by
	/// the share of the lot's remaining quantity taken.
	///
	/// Lots are mutated as they are consumed. If the queue runs dry the
	/// allocations made so far are kept and the shortfall is reported.
	pub fn sell_lot(&mut self, disposal: &Disposal) -> SaleOutcome {
		let mut outcome = SaleOutcome::default();

		let queue = match self.queues.get_mut(&disposal.isin) {
			Some(queue) if !queue.is_empty() => queue,
			_ => {
				outcome.shortfall = Some(Shortfall::NoInventory);
				return outcome;
			},
		};

		let total_quantity = disposal.quantity;
		let mut remaining = total_quantity;

		while remaining > ALLOCATION_TOLERANCE {
			let Some(lot) = queue.front_mut() else {
				outcome.shortfall = Some(Shortfall::Exhausted {
					unallocated: remaining,
				});
				break;
			};

			let take = remaining.min(lot.remaining_quantity);
			let ratio = take / total_quantity;

			let offset_used = lot.offset_per_unit() * take;
			let allocation = Allocation {
				lot_id: lot.id.clone(),
				acquisition_date: lot.acquisition_date,
				quantity: take,
				proceeds: disposal.proceeds * ratio,
				fees: disposal.fees * ratio,
				acquisition_cost: lot.unit_cost() * take,
				offset_used,
				acquisition_price_origin: lot.acquisition_price_origin,
				acquisition_fx_rate: lot.acquisition_fx_rate,
			};

			debug!(
				"[SELL] {} {} from lot {}: proceeds {}, cost {}, offset {}",
				take,
				disposal.symbol,
				lot.id,
				allocation.proceeds,
				allocation.acquisition_cost,
				offset_used
			);

			lot.remaining_quantity -= take;
			lot.accumulated_offset -= offset_used;
			remaining -= take;

			if lot.is_exhausted() {
				queue.pop_front();
			}

			outcome.allocations.push(allocation);
		}

		outcome
	}

	/// Total quantity still held for an instrument.
	pub fn open_quantity(&self, isin: &str) -> Decimal {
		self.queues
			.get(isin)
			.map(|queue| queue.iter().map(|lot| lot.remaining_quantity).sum())
			.unwrap_or(Decimal::ZERO)
	}

	/// Open lots of one instrument in FIFO order.
	#[cfg(test)]
	pub fn lots(&self, isin: &str) -> impl Iterator<Item = &TaxLot> {
		self.queues.get(isin).into_iter().flatten()
	}

	/// Every queue, in isin order, for in-place year-end accrual.
	pub fn queues_mut(
		&mut self,
	) -> impl Iterator<Item = (&String, &mut VecDeque<TaxLot>)> {
		self.queues.iter_mut()
	}

	/// Flattens the inventory into a list of open lots, oldest first, for
	/// reporting.
	pub fn open_lots(&self) -> Vec<&TaxLot> {
		let mut lots: Vec<&TaxLot> = self
			.queues
			.values()
			.flatten()
			.filter(|lot| lot.is_open())
			.collect();
		lots.sort();
		lots
	}

	pub fn is_empty(&self) -> bool {
		self.queues.values().all(|queue| queue.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::util::date::Date;
	use rand::Rng;
	use rust_decimal_macros::dec;
	use std::time::{Duration, Instant};

	const ISIN: &str = "IE00B4L5Y983";

	fn buy(portfolio: &mut Portfolio, id: &str, date: &str, qty: Decimal, cost: Decimal) {
		portfolio.buy_lot(&Acquisition {
			id: id.to_string(),
			isin: ISIN.to_string(),
			symbol: "EUNL".to_string(),
			date: Date::parse(date).unwrap(),
			quantity: qty,
			notional: cost,
			fees: Decimal::ZERO,
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		});
	}

	fn disposal(qty: Decimal, proceeds: Decimal, fees: Decimal) -> Disposal {
		Disposal {
			isin: ISIN.to_string(),
			symbol: "EUNL".to_string(),
			date: Date::parse("2023-06-01").unwrap(),
			quantity: qty,
			proceeds,
			fees,
			price_origin: Decimal::ZERO,
			fx_rate: Decimal::ONE,
		}
	}

	#[test]
	fn test_fifo_consumes_oldest_first() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(10), dec!(100));
		buy(&mut portfolio, "B", "2021-05-10", dec!(20), dec!(300));
		buy(&mut portfolio, "C", "2022-02-01", dec!(10), dec!(300));

		let outcome = portfolio.sell_lot(&disposal(dec!(40), dec!(800), dec!(4)));
		assert!(outcome.shortfall.is_none());

		let ids: Vec<&str> =
			outcome.allocations.iter().map(|a| a.lot_id.as_str()).collect();
		assert_eq!(ids, vec!["A", "B", "C"]);

		let a = &outcome.allocations[0];
		assert_eq!(a.quantity, dec!(10));
		assert_eq!(a.proceeds, dec!(200));
		assert_eq!(a.fees, dec!(1));
		assert_eq!(a.acquisition_cost, dec!(100));
		assert_eq!(a.raw_profit(), dec!(99));

		let b = &outcome.allocations[1];
		assert_eq!(b.proceeds, dec!(400));
		assert_eq!(b.fees, dec!(2));
		assert_eq!(b.acquisition_cost, dec!(300));

		let c = &outcome.allocations[2];
		assert_eq!(c.proceeds, dec!(200));
		assert_eq!(c.fees, dec!(1));
		assert_eq!(c.acquisition_cost, dec!(300));
		assert_eq!(c.raw_profit(), dec!(-101));

		assert!(portfolio.is_empty());
	}

	#[test]
	fn test_partial_take_leaves_head_in_place() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(10), dec!(100));
		buy(&mut portfolio, "B", "2021-05-10", dec!(10), dec!(150));

		let outcome = portfolio.sell_lot(&disposal(dec!(4), dec!(60), dec!(0)));
		assert_eq!(outcome.allocations.len(), 1);
		assert_eq!(outcome.allocations[0].lot_id, "A");

		let heads: Vec<(&str, Decimal)> = portfolio
			.lots(ISIN)
			.map(|l| (l.id.as_str(), l.remaining_quantity))
			.collect();
		assert_eq!(heads, vec![("A", dec!(6)), ("B", dec!(10))]);
	}

	#[test]
	fn test_proportional_exactness() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(3), dec!(1000));

		// a third of a lot whose unit cost does not terminate
		let outcome = portfolio.sell_lot(&disposal(dec!(1), dec!(400), dec!(0)));
		let expected = dec!(1000) / dec!(3);
		let diff = (outcome.allocations[0].acquisition_cost - expected).abs();
		assert!(diff < dec!(0.0000001));

		// the remaining two thirds together with the first make the whole cost
		let rest = portfolio.sell_lot(&disposal(dec!(2), dec!(800), dec!(0)));
		let total = outcome.allocations[0].acquisition_cost
			+ rest.allocations[0].acquisition_cost;
		assert!((total - dec!(1000)).abs() < dec!(0.0000001));
		assert!(portfolio.is_empty());
	}

	#[test]
	fn test_offset_is_consumed_proportionally() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(100), dec!(1000));
		for (_, queue) in portfolio.queues_mut() {
			queue[0].accumulated_offset = dec!(7);
		}

		let outcome = portfolio.sell_lot(&disposal(dec!(25), dec!(300), dec!(0)));
		assert_eq!(outcome.allocations[0].offset_used, dec!(1.75));

		let lot = portfolio.lots(ISIN).next().unwrap();
		assert_eq!(lot.accumulated_offset, dec!(5.25));
		assert_eq!(lot.remaining_quantity, dec!(75));
	}

	#[test]
	fn test_no_inventory() {
		let mut portfolio = Portfolio::new();
		let outcome = portfolio.sell_lot(&disposal(dec!(5), dec!(50), dec!(0)));
		assert!(outcome.allocations.is_empty());
		assert_eq!(outcome.shortfall, Some(Shortfall::NoInventory));
		assert!(portfolio.is_empty());
	}

	#[test]
	fn test_exhausted_keeps_partial_allocations() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(10), dec!(100));

		let outcome = portfolio.sell_lot(&disposal(dec!(20), dec!(400), dec!(4)));
		assert_eq!(outcome.allocations.len(), 1);
		assert_eq!(outcome.allocated_quantity(), dec!(10));
		// proceeds are split by share of the whole disposal, not of what matched
		assert_eq!(outcome.allocations[0].proceeds, dec!(200));
		assert_eq!(outcome.allocations[0].fees, dec!(2));
		assert_eq!(
			outcome.shortfall,
			Some(Shortfall::Exhausted {
				unallocated: dec!(10)
			})
		);
		assert_eq!(portfolio.open_quantity(ISIN), Decimal::ZERO);
	}

	#[test]
	fn test_dust_lot_is_closed() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "A", "2021-01-10", dec!(1.0000005), dec!(10));
		portfolio.sell_lot(&disposal(dec!(1), dec!(10), dec!(0)));
		assert!(portfolio.lots(ISIN).next().is_none());
	}

	#[test]
	fn test_generated_ids() {
		let mut portfolio = Portfolio::new();
		buy(&mut portfolio, "", "2021-01-10", dec!(1), dec!(1));
		buy(&mut portfolio, "", "2021-01-11", dec!(1), dec!(1));
		let ids: Vec<&str> = portfolio.lots(ISIN).map(|l| l.id.as_str()).collect();
		assert_eq!(ids, vec!["1", "2"]);
	}

	#[test]
	fn test_conservation_stress() {
		let duration = Duration::from_millis(500);
		let start_time = Instant::now();
		let mut rng = rand::thread_rng();

		while Instant::now() - start_time < duration {
			let mut portfolio = Portfolio::new();
			let mut bought = Decimal::ZERO;
			let mut sold = Decimal::ZERO;

			for step in 0..40 {
				let qty = Decimal::new(rng.gen_range(1..100_000), 3);
				let held = portfolio.open_quantity(ISIN);

				if rng.gen_bool(0.5) || held.is_zero() {
					buy(&mut portfolio, &step.to_string(), "2021-01-10", qty, qty * dec!(10));
					bought += qty;
				} else {
					// never sell more than is held, so there is no data fault
					let qty = qty.min(held);
					let outcome = portfolio.sell_lot(&disposal(qty, qty * dec!(12), dec!(1)));
					assert!(outcome.shortfall.is_none());
					assert_eq!(outcome.allocated_quantity(), qty);
					sold += qty;
				}

				assert_eq!(portfolio.open_quantity(ISIN), bought - sold);
			}
		}
	}
}
