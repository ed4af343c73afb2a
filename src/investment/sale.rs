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
use crate::util::date::Date;
use rust_decimal::Decimal;

/// A disposal as requested by the transaction stream. Quantity, proceeds and
/// fees are magnitudes; the stream's sign conventions are resolved before a
/// disposal is built.
#[derive(Clone, Debug)]
pub struct Disposal {
	pub isin: String,
	pub symbol: String,
	pub date: Date,
	pub quantity: Decimal,
	pub proceeds: Decimal,
	pub fees: Decimal,
	pub price_origin: Decimal,
	pub fx_rate: Decimal,
}

/// The share of one disposal matched against one lot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
	pub lot_id: String,
	pub acquisition_date: Date,
	pub quantity: Decimal,

	pub proceeds: Decimal,
	pub fees: Decimal,
	pub acquisition_cost: Decimal,
	/// Previously taxed deemed distributions credited against this take
	pub offset_used: Decimal,

	pub acquisition_price_origin: Decimal,
	pub acquisition_fx_rate: Decimal,
}

impl Allocation {
	/// Gain before any partial exemption.
	pub fn raw_profit(&self) -> Decimal {
		self.proceeds - self.fees - self.acquisition_cost - self.offset_used
	}
}

/// Why a disposal could not be matched in full.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shortfall {
	/// No open lot at all for the instrument; nothing was allocated.
	NoInventory,
	/// Lots ran out part way; `unallocated` units had nothing to match.
	Exhausted { unallocated: Decimal },
}

/// Result of matching a disposal. Allocations already produced stay valid
/// even when a shortfall is reported.
#[derive(Clone, Debug, Default)]
pub struct SaleOutcome {
	pub allocations: Vec<Allocation>,
	pub shortfall: Option<Shortfall>,
}

impl SaleOutcome {
	pub fn allocated_quantity(&self) -> Decimal {
		self.allocations.iter().map(|a| a.quantity).sum()
	}
}
