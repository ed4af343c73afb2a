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

/// Standard table renderer for the reports, each of which is a list of
/// single-line records with an optional totals block.
pub struct Table {
	column_count: usize,
	rows: Vec<Row>,
	right_align: Vec<bool>, // indicates columns by index
}

pub enum Row {
	Header(Vec<String>),
	Data(Vec<String>),
	Separator,
	PartialSeparator(Vec<bool>), // indicates columns by index
}

impl Table {
	pub fn new(column_count: usize) -> Self {
		Self {
			column_count,
			rows: Vec::new(),
			right_align: vec![false; column_count],
		}
	}

	/// Adds a header row.
	pub fn add_header(&mut self, row: Vec<&str>) {
		self.rows.push(Row::Header(
			row.into_iter().map(|s| s.to_string()).collect(),
		));
	}

	/// Adds a data row.
	pub fn add_row(&mut self, row: Vec<String>) {
		self.rows.push(Row::Data(row));
	}

	/// Adds a full separator row.
	pub fn add_separator(&mut self) {
		self.rows.push(Row::Separator);
	}

	/// Adds a partial separator row for selected columns.
	pub fn add_partial_separator(&mut self, indices: Vec<usize>) {
		let mut cols = vec![false; self.column_count];
		for i in indices {
			cols[i] = true;
		}
		self.rows.push(Row::PartialSeparator(cols));
	}

	/// Specifies columns that should be right-aligned by index.
	pub fn right_align(&mut self, cols: Vec<usize>) {
		for col in cols {
			self.right_align[col] = true;
		}
	}

	/// Renders the table with a leading blank line. Lines carry no trailing
	/// whitespace.
	pub fn render(&self) -> String {
		let mut max_widths = vec![0; self.column_count];

		// Calculate maximum column widths for proper spacing
		for row in &self.rows {
			if let Row::Data(data_row) | Row::Header(data_row) = row {
				for (i, value) in data_row.iter().enumerate() {
					max_widths[i] = max_widths[i].max(value.len());
				}
			}
		}

		let mut out = String::from("\n");
		for row in &self.rows {
			let line = match row {
				Row::Header(header_row) => {
					self.centered_row(&max_widths, header_row, " | ")
				},
				Row::Data(data_row) => self.data_row(&max_widths, data_row, "   "),
				Row::Separator => self.separator(&max_widths),
				Row::PartialSeparator(data_sep) => {
					self.partial_separator(&max_widths, data_sep)
				},
			};
			out.push_str(line.trim_end());
			out.push('\n');
		}
		out
	}

	fn data_row(&self, max_widths: &[usize], data_row: &[String], separator: &str) -> String {
		let cells: Vec<String> = data_row
			.iter()
			.enumerate()
			.map(|(i, value)| {
				if self.right_align[i] {
					format!("{:>width$}", value, width = max_widths[i])
				} else {
					format!("{:<width$}", value, width = max_widths[i])
				}
			})
			.collect();
		cells.join(separator)
	}

	fn centered_row(
		&self,
		max_widths: &[usize],
		data_row: &[String],
		separator: &str,
	) -> String {
		let cells: Vec<String> = data_row
			.iter()
			.enumerate()
			.map(|(i, value)| Table::center_align(value, max_widths[i]))
			.collect();
		cells.join(separator)
	}

	fn separator(&self, max_widths: &[usize]) -> String {
		let total_width: usize =
			max_widths.iter().sum::<usize>() + (3 * (self.column_count - 1));
		"-".repeat(total_width)
	}

	fn partial_separator(&self, max_widths: &[usize], data_sep: &[bool]) -> String {
		let cells: Vec<String> = data_sep
			.iter()
			.enumerate()
			.map(|(i, draw)| {
				let fill = if *draw { "-" } else { " " };
				fill.repeat(max_widths[i])
			})
			.collect();
		cells.join("   ")
	}

	fn center_align(value: &str, width: usize) -> String {
		if value.len() >= width {
			return value.to_string();
		}
		let total_padding = width - value.len();
		let left_padding = total_padding / 2;
		let right_padding = total_padding - left_padding;

		format!(
			"{}{}{}",
			" ".repeat(left_padding),
			value,
			" ".repeat(right_padding)
		)
	}
}
