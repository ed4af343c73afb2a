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
use crate::investment::instrument::Instrument;
use crate::reference::InstrumentDirectory;
use anyhow::{anyhow, bail, Error};
use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Instrument classifications kept in a JSON object keyed by isin:
///
/// ```json
/// { "IE00B4L5Y983": { "name": "iShares Core MSCI World", "exemption_rate": 0.3 } }
/// ```
#[derive(Debug)]
pub struct InstrumentTable {
	instruments: BTreeMap<String, Instrument>,
	default_rate: Decimal,
}

impl InstrumentTable {
	pub fn new(default_rate: Decimal) -> Self {
		Self {
			instruments: BTreeMap::new(),
			default_rate,
		}
	}

	/// Loads the table from a file. A missing file leaves every instrument
	/// unclassified rather than failing the run.
	pub fn load(path: &Path, default_rate: Decimal) -> Result<Self, Error> {
		if !path.exists() {
			info!(
				"No instrument file at {}, every instrument uses the default exemption rate {}",
				path.display(),
				default_rate
			);
			return Ok(Self::new(default_rate));
		}

		let content = fs::read_to_string(path)?;
		Self::from_json(&content, default_rate)
			.map_err(|e| anyhow!("{}: {}", path.display(), e))
	}

	pub fn from_json(content: &str, default_rate: Decimal) -> Result<Self, Error> {
		let raw: BTreeMap<String, Instrument> = serde_json::from_str(content)
			.map_err(|e| anyhow!("failed to parse instruments: {}", e))?;

		let mut table = Self::new(default_rate);
		for (isin, mut instrument) in raw {
			instrument.isin = isin;
			table.insert(instrument)?;
		}
		Ok(table)
	}

	pub fn insert(&mut self, instrument: Instrument) -> Result<(), Error> {
		if instrument.exemption_rate < Decimal::ZERO
			|| instrument.exemption_rate > Decimal::ONE
		{
			bail!(
				"exemption rate of {} must be between 0 and 1, got {}",
				instrument.isin,
				instrument.exemption_rate
			);
		}
		debug!("Classified {}", instrument);
		self.instruments.insert(instrument.isin.clone(), instrument);
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.instruments.len()
	}
}

impl InstrumentDirectory for InstrumentTable {
	fn find(&self, isin: &str) -> Option<&Instrument> {
		self.instruments.get(isin)
	}

	fn default_exemption_rate(&self) -> Decimal {
		self.default_rate
	}
}
