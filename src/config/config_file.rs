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
use crate::investment::instrument::DEFAULT_EXEMPTION_RATE;
use anyhow::{bail, Error};
use dirs::home_dir;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	pub data: Option<DataFiles>,
	pub tax: Option<TaxSettings>,
}

/// Reference data locations. Relative paths are taken relative to the
/// config file.
#[derive(Debug, Default, Deserialize)]
pub struct DataFiles {
	/// CSV of year,isin,price
	pub prices: Option<String>,
	/// CSV of year,rate
	pub base_rates: Option<String>,
	/// JSON object keyed by isin
	pub instruments: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaxSettings {
	/// Applied to instruments missing from the instruments file
	pub default_exemption_rate: Decimal,
	pub flat_rate: Decimal,
	/// Levied on top of the flat rate
	pub surcharge_rate: Decimal,

	/// Years before this are processed but not reported.
	pub first_report_year: Option<i32>,
}

impl Default for TaxSettings {
	fn default() -> Self {
		Self {
			default_exemption_rate: DEFAULT_EXEMPTION_RATE,
			flat_rate: dec!(0.25),
			surcharge_rate: dec!(0.055),
			first_report_year: None,
		}
	}
}

impl Config {
	pub fn tax_settings(&self) -> TaxSettings {
		self.tax.clone().unwrap_or_default()
	}

	/// Rejects tax settings no computation could use.
	pub fn validate(&self) -> Result<(), Error> {
		let Some(tax) = &self.tax else {
			return Ok(());
		};

		let rate = tax.default_exemption_rate;
		if rate < Decimal::ZERO || rate > Decimal::ONE {
			bail!("default_exemption_rate must be between 0 and 1, got {}", rate);
		}
		if tax.flat_rate < Decimal::ZERO || tax.surcharge_rate < Decimal::ZERO {
			bail!(
				"flat_rate and surcharge_rate cannot be negative, got {} and {}",
				tax.flat_rate,
				tax.surcharge_rate
			);
		}
		Ok(())
	}

	/// Makes data paths absolute against `base`, expanding a leading `~/`.
	pub fn resolve_paths(&mut self, base: &Path) {
		if let Some(data) = &mut self.data {
			for path in [&mut data.prices, &mut data.base_rates, &mut data.instruments]
				.into_iter()
				.flatten()
			{
				*path = resolve(path, base).to_string_lossy().to_string();
			}
		}
	}
}

fn resolve(path: &str, base: &Path) -> PathBuf {
	if let Some(rest) = path.strip_prefix("~/") {
		if let Some(home) = home_dir() {
			return home.join(rest);
		}
	}

	let path = PathBuf::from(path);
	if path.is_absolute() {
		path
	} else {
		base.join(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_config() {
		let mut config: Config = toml::from_str(
			r#"
			[data]
			prices = "prices.csv"
			base_rates = "/srv/fundtax/rates.csv"

			[tax]
			default_exemption_rate = 0.15
			surcharge_rate = "0.0"
			"#,
		)
		.unwrap();
		config.resolve_paths(Path::new("/home/user/.config/fundtax"));

		let data = config.data.as_ref().unwrap();
		assert_eq!(
			data.prices.as_deref(),
			Some("/home/user/.config/fundtax/prices.csv")
		);
		assert_eq!(data.base_rates.as_deref(), Some("/srv/fundtax/rates.csv"));
		assert!(data.instruments.is_none());

		let tax = config.tax_settings();
		assert_eq!(tax.default_exemption_rate, dec!(0.15));
		assert_eq!(tax.flat_rate, dec!(0.25));
		assert_eq!(tax.surcharge_rate, Decimal::ZERO);
	}

	#[test]
	fn test_rates_out_of_range() {
		let parse = |s: &str| toml::from_str::<Config>(s).unwrap();
		assert!(parse("[tax]\ndefault_exemption_rate = 1.5").validate().is_err());
		assert!(parse("[tax]\ndefault_exemption_rate = -0.1").validate().is_err());
		assert!(parse("[tax]\nflat_rate = -0.25").validate().is_err());
		assert!(parse("[tax]\ndefault_exemption_rate = 1").validate().is_ok());
		assert!(parse("").validate().is_ok());
	}

	#[test]
	fn test_empty_config() {
		let config: Config = toml::from_str("").unwrap();
		assert!(config.data.is_none());
		assert_eq!(config.tax_settings(), TaxSettings::default());
	}
}
