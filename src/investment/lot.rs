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
use crate::util::date::{Date, Duration};
use crate::util::decimal::LOT_CLOSE_TOLERANCE;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// A discrete batch of a security acquired in a single purchase, tracked
/// until it is fully disposed. Its cost basis includes the acquisition fees.
///
/// A lot is mutated from two places only: a sale consumes quantity (and the
/// matching share of the pending offset), and a year-end close adds to the
/// pending offset. Both go through the owning `Portfolio`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxLot {
	pub id: String,
	pub isin: String,
	pub symbol: String,

	pub acquisition_date: Date,

	pub original_quantity: Decimal,
	/// Never negative; the lot leaves its queue once this is within tolerance
	pub remaining_quantity: Decimal,

	/// Trade notional plus acquisition fees, in settlement currency
	pub total_cost: Decimal,

	/// Deemed distributions already taxed on the remaining quantity and not
	/// yet credited against a disposal
	pub accumulated_offset: Decimal,

	pub acquisition_price_origin: Decimal,
	pub acquisition_fx_rate: Decimal,
}

/// Everything needed to open a lot.
#[derive(Clone, Debug)]
pub struct Acquisition {
	pub id: String,
	pub isin: String,
	pub symbol: String,
	pub date: Date,
	pub quantity: Decimal,
	pub notional: Decimal,
	pub fees: Decimal,
	pub price_origin: Decimal,
	pub fx_rate: Decimal,
}

impl TaxLot {
	pub fn open(acquisition: &Acquisition) -> Self {
		Self {
			id: acquisition.id.clone(),
			isin: acquisition.isin.clone(),
			symbol: acquisition.symbol.clone(),
			acquisition_date: acquisition.date,
			original_quantity: acquisition.quantity,
			remaining_quantity: acquisition.quantity,
			total_cost: acquisition.notional + acquisition.fees,
			accumulated_offset: Decimal::ZERO,
			acquisition_price_origin: acquisition.price_origin,
			acquisition_fx_rate: acquisition.fx_rate,
		}
	}

	/// Average cost per unit. Always over the original quantity, so repeated
	/// partial disposals see the same basis.
	pub fn unit_cost(&self) -> Decimal {
		if self.original_quantity.is_zero() {
			return Decimal::ZERO;
		}
		self.total_cost / self.original_quantity
	}

	/// Pending offset attributable to each unit still held.
	pub fn offset_per_unit(&self) -> Decimal {
		if self.remaining_quantity.is_zero() {
			return Decimal::ZERO;
		}
		self.accumulated_offset / self.remaining_quantity
	}

	pub fn is_open(&self) -> bool {
		self.remaining_quantity > Decimal::ZERO
	}

	pub fn is_exhausted(&self) -> bool {
		self.remaining_quantity <= LOT_CLOSE_TOLERANCE
	}

	pub fn time_held(&self, as_of: &Date) -> Duration {
		self.acquisition_date.until(as_of)
	}
}

impl PartialOrd for TaxLot {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// FIFO order across instruments: acquisition date, then isin, then id.
impl Ord for TaxLot {
	fn cmp(&self, other: &Self) -> Ordering {
		self.acquisition_date
			.cmp(&other.acquisition_date)
			.then_with(|| self.isin.cmp(&other.isin))
			.then_with(|| self.id.cmp(&other.id))
	}
}
