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
use crate::investment::lot::Acquisition;
use crate::investment::portfolio::Portfolio;
use crate::investment::sale::{Disposal, Shortfall};
use crate::investment::transaction::{Transaction, TransactionKind};
use crate::reference::{BaseRateLookup, InstrumentDirectory, PriceLookup};
use crate::tax::distributions::{AttributionPolicy, DistributionTracker, OpenQuantityAtProcessing};
use crate::tax::event::TaxEvent;
use crate::tax::exemptions::ExemptionResolver;
use crate::tax::fault::{Fault, FaultLog};
use crate::tax::ledger::TaxLedger;
use crate::tax::year_end::YearEndCloser;
use log::{debug, trace, warn};
use std::collections::BTreeSet;

/// Owns all mutable tax state for one run: the lot inventory, the per-year
/// distribution totals, the ledger and the fault log. Transactions are fed
/// in chronological order and each year is closed once, after its last
/// transaction.
pub struct TaxEngine<'a> {
	exemptions: ExemptionResolver<'a>,
	closer: YearEndCloser<'a>,
	policy: Box<dyn AttributionPolicy>,

	portfolio: Portfolio,
	distributions: DistributionTracker,
	ledger: TaxLedger,
	faults: FaultLog,
	closed_years: BTreeSet<i32>,
}

impl<'a> TaxEngine<'a> {
	pub fn new(
		instruments: &'a dyn InstrumentDirectory,
		base_rates: &'a dyn BaseRateLookup,
		prices: &'a dyn PriceLookup,
	) -> Self {
		Self {
			exemptions: ExemptionResolver::new(instruments),
			closer: YearEndCloser::new(base_rates, prices),
			policy: Box::new(OpenQuantityAtProcessing),
			portfolio: Portfolio::new(),
			distributions: DistributionTracker::new(),
			ledger: TaxLedger::new(),
			faults: FaultLog::new(),
			closed_years: BTreeSet::new(),
		}
	}

	pub fn with_policy(mut self, policy: Box<dyn AttributionPolicy>) -> Self {
		self.policy = policy;
		self
	}

	/// Applies one transaction. Nothing here fails: whatever cannot be
	/// computed is recorded as a fault and the rest of the transaction still
	/// takes effect.
	pub fn process(&mut self, tx: &Transaction) {
		trace!("[{}] {} {} {} {}", tx.kind, tx.id, tx.symbol, tx.quantity, tx.amount);

		match tx.kind {
			TransactionKind::Buy => self.buy(tx),
			TransactionKind::Sell => self.sell(tx),
			TransactionKind::Dividend => self.dividend(tx),
			TransactionKind::WithholdingTax => {
				self.ledger
					.append(TaxEvent::withholding(tx.date(), &tx.isin, &tx.symbol, tx.amount));
			},
			TransactionKind::Interest => {
				self.ledger
					.append(TaxEvent::interest(tx.date(), &tx.isin, &tx.symbol, tx.amount));
			},
		}
	}

	fn buy(&mut self, tx: &Transaction) {
		self.portfolio.buy_lot(&Acquisition {
			id: tx.id.clone(),
			isin: tx.isin.clone(),
			symbol: tx.symbol.clone(),
			date: tx.date(),
			quantity: tx.quantity.abs(),
			notional: tx.amount.abs(),
			fees: tx.fees.abs(),
			price_origin: tx.price_origin,
			fx_rate: tx.fx_rate,
		});
	}

	fn sell(&mut self, tx: &Transaction) {
		let disposal = Disposal {
			isin: tx.isin.clone(),
			symbol: tx.symbol.clone(),
			date: tx.date(),
			quantity: tx.quantity.abs(),
			proceeds: tx.amount.abs(),
			fees: tx.fees.abs(),
			price_origin: tx.price_origin,
			fx_rate: tx.fx_rate,
		};

		let outcome = self.portfolio.sell_lot(&disposal);
		debug!(
			"{} sale {}: {} of {} units matched",
			disposal.date,
			tx.id,
			outcome.allocated_quantity(),
			disposal.quantity
		);
		if !outcome.allocations.is_empty() {
			let exemption_rate = self.exemptions.rate(&tx.isin, &tx.symbol, &mut self.faults);
			for allocation in &outcome.allocations {
				self.ledger
					.append(TaxEvent::sale(&disposal, allocation, exemption_rate));
			}
		}

		match outcome.shortfall {
			Some(Shortfall::NoInventory) => self.faults.record(Fault::NoInventory {
				transaction_id: tx.id.clone(),
				isin: tx.isin.clone(),
				symbol: tx.symbol.clone(),
				date: disposal.date,
				quantity: disposal.quantity,
			}),
			Some(Shortfall::Exhausted { unallocated }) => {
				self.faults.record(Fault::InventoryExhausted {
					transaction_id: tx.id.clone(),
					isin: tx.isin.clone(),
					symbol: tx.symbol.clone(),
					date: disposal.date,
					unallocated,
				})
			},
			None => {},
		}
	}

	fn dividend(&mut self, tx: &Transaction) {
		let date = tx.date();
		let exemption_rate = self.exemptions.rate(&tx.isin, &tx.symbol, &mut self.faults);
		self.ledger.append(TaxEvent::dividend(
			date,
			&tx.isin,
			&tx.symbol,
			tx.amount,
			exemption_rate,
		));

		let quantity = self
			.policy
			.attributable_quantity(&self.portfolio, &tx.isin, date);
		if self
			.distributions
			.record(date.year(), &tx.isin, tx.amount, quantity)
			.is_none()
		{
			self.faults.record(Fault::UnattributedDistribution {
				transaction_id: tx.id.clone(),
				isin: tx.isin.clone(),
				date,
				amount: tx.amount,
			});
		}
	}

	/// Computes deemed distributions for `year` on everything still held.
	/// A year is closed at most once; later calls do nothing.
	pub fn close_year(&mut self, year: i32) -> usize {
		if !self.closed_years.insert(year) {
			warn!("{}: already closed, skipping", year);
			return 0;
		}

		self.closer.close(
			year,
			&mut self.portfolio,
			&self.distributions,
			&mut self.exemptions,
			&mut self.ledger,
			&mut self.faults,
		)
	}

	pub fn is_closed(&self, year: i32) -> bool {
		self.closed_years.contains(&year)
	}

	pub fn portfolio(&self) -> &Portfolio {
		&self.portfolio
	}

	pub fn ledger(&self) -> &TaxLedger {
		&self.ledger
	}

	pub fn faults(&self) -> &FaultLog {
		&self.faults
	}

	pub fn distributions(&self) -> &DistributionTracker {
		&self.distributions
	}

	pub fn policy_name(&self) -> &'static str {
		self.policy.name()
	}
}
