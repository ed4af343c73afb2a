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
use log::warn;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Something that could not be computed. None of these stop a run: the
/// affected item is skipped and processing continues, so the ledger holds
/// exactly what could be computed and this list says what could not.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Fault {
	#[error("{date} sale {transaction_id}: no open lots for {symbol} ({isin}), {quantity} units skipped")]
	NoInventory {
		transaction_id: String,
		isin: String,
		symbol: String,
		date: Date,
		quantity: Decimal,
	},

	#[error("{date} sale {transaction_id}: lots for {symbol} ({isin}) ran out with {unallocated} units unmatched")]
	InventoryExhausted {
		transaction_id: String,
		isin: String,
		symbol: String,
		date: Date,
		unallocated: Decimal,
	},

	#[error("{date} distribution {transaction_id} of {amount} for {isin}: no open quantity to attribute it to")]
	UnattributedDistribution {
		transaction_id: String,
		isin: String,
		date: Date,
		amount: Decimal,
	},

	#[error("{year}: no year-end price for {isin}, deemed distribution skipped on {open_quantity} units")]
	MissingYearEndPrice {
		isin: String,
		year: i32,
		open_quantity: Decimal,
	},

	#[error("{year}: no base rate on record, treated as zero")]
	MissingBaseRate { year: i32 },

	#[error("{symbol} ({isin}) is not classified, using default exemption rate {default_rate}")]
	UnclassifiedInstrument {
		isin: String,
		symbol: String,
		default_rate: Decimal,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaultCategory {
	/// Input contradicts itself, e.g. selling more than was bought
	DataInconsistency,
	/// A price or rate the computation needed is absent
	MissingReferenceData,
	/// Reference data exists but does not cover an instrument
	ConfigurationGap,
}

impl fmt::Display for FaultCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			FaultCategory::DataInconsistency => "Data inconsistency",
			FaultCategory::MissingReferenceData => "Missing reference data",
			FaultCategory::ConfigurationGap => "Configuration gap",
		};
		write!(f, "{}", s)
	}
}

impl Fault {
	pub fn category(&self) -> FaultCategory {
		match self {
			Fault::NoInventory { .. }
			| Fault::InventoryExhausted { .. }
			| Fault::UnattributedDistribution { .. } => FaultCategory::DataInconsistency,
			Fault::MissingYearEndPrice { .. } | Fault::MissingBaseRate { .. } => {
				FaultCategory::MissingReferenceData
			},
			Fault::UnclassifiedInstrument { .. } => FaultCategory::ConfigurationGap,
		}
	}

	/// The year the fault affects, where there is one.
	pub fn year(&self) -> Option<i32> {
		match self {
			Fault::NoInventory { date, .. }
			| Fault::InventoryExhausted { date, .. }
			| Fault::UnattributedDistribution { date, .. } => Some(date.year()),
			Fault::MissingYearEndPrice { year, .. } | Fault::MissingBaseRate { year } => {
				Some(*year)
			},
			Fault::UnclassifiedInstrument { .. } => None,
		}
	}
}

/// Faults in the order they occurred.
#[derive(Debug, Default)]
pub struct FaultLog {
	faults: Vec<Fault>,
}

impl FaultLog {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn record(&mut self, fault: Fault) {
		warn!("{}", fault);
		self.faults.push(fault);
	}

	#[cfg(test)]
	pub fn all(&self) -> &[Fault] {
		&self.faults
	}

	pub fn by_category(&self, category: FaultCategory) -> impl Iterator<Item = &Fault> {
		self.faults.iter().filter(move |f| f.category() == category)
	}

	pub fn for_year(&self, year: i32) -> impl Iterator<Item = &Fault> {
		self.faults.iter().filter(move |f| f.year() == Some(year))
	}

	pub fn is_empty(&self) -> bool {
		self.faults.is_empty()
	}

	pub fn len(&self) -> usize {
		self.faults.len()
	}
}
