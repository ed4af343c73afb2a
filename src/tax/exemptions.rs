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
use crate::reference::InstrumentDirectory;
use crate::tax::fault::{Fault, FaultLog};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Resolves exemption rates through the instrument directory and reports
/// each unclassified isin once per run.
pub struct ExemptionResolver<'a> {
	directory: &'a dyn InstrumentDirectory,
	reported: BTreeSet<String>,
}

impl<'a> ExemptionResolver<'a> {
	pub fn new(directory: &'a dyn InstrumentDirectory) -> Self {
		Self {
			directory,
			reported: BTreeSet::new(),
		}
	}

	pub fn rate(&mut self, isin: &str, symbol: &str, faults: &mut FaultLog) -> Decimal {
		if let Some(instrument) = self.directory.find(isin) {
			return instrument.exemption_rate;
		}

		let default_rate = self.directory.default_exemption_rate();
		if self.reported.insert(isin.to_string()) {
			faults.record(Fault::UnclassifiedInstrument {
				isin: isin.to_string(),
				symbol: symbol.to_string(),
				default_rate,
			});
		}
		default_rate
	}
}
