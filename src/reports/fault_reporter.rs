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
use crate::parsing::transactions::LoadResult;
use crate::tax::fault::{FaultCategory, FaultLog};

const CATEGORIES: [FaultCategory; 3] = [
	FaultCategory::DataInconsistency,
	FaultCategory::MissingReferenceData,
	FaultCategory::ConfigurationGap,
];

/// Summarises what ingestion dropped and everything the engine could not
/// compute.
pub struct FaultReporter<'a> {
	load: &'a LoadResult,
	faults: &'a FaultLog,
}

impl<'a> FaultReporter<'a> {
	pub fn new(load: &'a LoadResult, faults: &'a FaultLog) -> Self {
		Self { load, faults }
	}

	pub fn render(&self) -> String {
		let mut out = format!("{} transactions loaded\n", self.load.transactions.len());

		for (bucket, symbols) in &self.load.ignored {
			let symbols: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
			out.push_str(&format!(
				"Ignored {}: {} ({})\n",
				bucket,
				symbols.len(),
				symbols.join(", ")
			));
		}

		if !self.load.cancelled_pairs.is_empty() {
			out.push_str(&format!(
				"Cancelled: {} pairs removed\n",
				self.load.cancelled_pairs.len()
			));
		}
		for orphan in &self.load.orphan_cancellations {
			out.push_str(&format!(
				"Orphan cancellation {}: {} {} on {}\n",
				orphan.id,
				orphan.quantity,
				orphan.symbol,
				orphan.date()
			));
		}

		out.push('\n');
		if self.faults.is_empty() {
			out.push_str("No faults\n");
			return out;
		}

		for category in CATEGORIES {
			let faults: Vec<String> = self
				.faults
				.by_category(category)
				.map(|fault| fault.to_string())
				.collect();
			if faults.is_empty() {
				continue;
			}

			out.push_str(&format!("{} ({})\n", category, faults.len()));
			for fault in faults {
				out.push_str(&format!("  {}\n", fault));
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tax::fault::Fault;
	use rust_decimal_macros::dec;
	use std::collections::BTreeSet;

	#[test]
	fn test_render_faults() {
		let mut load = LoadResult::default();
		load.ignored
			.insert("CASH".to_string(), BTreeSet::from(["EUR.USD".to_string()]));

		let mut faults = FaultLog::new();
		faults.record(Fault::UnclassifiedInstrument {
			isin: "US0378331005".to_string(),
			symbol: "AAPL".to_string(),
			default_rate: dec!(0.30),
		});
		faults.record(Fault::MissingBaseRate { year: 2024 });

		let out = FaultReporter::new(&load, &faults).render();
		assert_eq!(
			out,
			"0 transactions loaded
Ignored CASH: 1 (EUR.USD)

Missing reference data (1)
  2024: no base rate on record, treated as zero
Configuration gap (1)
  AAPL (US0378331005) is not classified, using default exemption rate 0.30
"
		);
	}

	#[test]
	fn test_no_faults() {
		let load = LoadResult::default();
		let faults = FaultLog::new();
		let out = FaultReporter::new(&load, &faults).render();
		assert_eq!(out, "0 transactions loaded\n\nNo faults\n");
	}
}
