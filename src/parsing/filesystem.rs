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
use crate::config::config_file::Config;
use anyhow::{anyhow, bail, Error};
use dirs::home_dir;
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct Filesystem {
	/// Set of file paths that have been read.
	/// Used to avoid counting the same export twice.
	loaded_files: HashSet<String>,
}

impl Filesystem {
	pub fn new() -> Self {
		Self {
			loaded_files: HashSet::new(),
		}
	}

	pub fn open(&self, file_path: &str) -> Result<File, Error> {
		let path = Path::new(file_path);
		let file =
			File::open(path).map_err(|e| anyhow!("cannot open {}: {}", file_path, e))?;
		Ok(file)
	}

	pub fn declare_file(&mut self, file_path: &str) -> Result<(), Error> {
		if self.loaded_files.contains(file_path) {
			bail!("File given more than once: {}", file_path)
		}
		self.loaded_files.insert(file_path.to_string());
		Ok(())
	}

	/// Fetches the config from the given path, or default path if none.
	/// Data paths in the result are resolved against the config's directory.
	pub fn get_config(&self, custom_config_path: Option<&String>) -> Result<Config, Error> {
		let config_path = match &custom_config_path {
			None => {
				let home_dir = home_dir()
					.ok_or_else(|| anyhow!("Unable to determine home directory"))?;
				home_dir.join(".config/fundtax/config.toml")
			},
			Some(p) => PathBuf::from(p),
		};

		// create empty config file if it doesn't exist
		if !config_path.exists() && custom_config_path.is_none() {
			if let Some(parent) = config_path.parent() {
				fs::create_dir_all(parent)?;
			}
			File::create(config_path.clone())?;
		}

		let content = fs::read_to_string(&config_path)
			.map_err(|e| anyhow!("cannot read {}: {}", config_path.display(), e))?;
		let mut config: Config = toml::from_str(&content)
			.map_err(|e| anyhow!("failed to parse config: {}", e))?;
		config
			.validate()
			.map_err(|e| anyhow!("{}: {}", config_path.display(), e))?;

		if let Some(dir) = config_path.parent() {
			config.resolve_paths(dir);
		}

		Ok(config)
	}
}
