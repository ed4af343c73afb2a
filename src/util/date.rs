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

use anyhow::{bail, Error};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A calendar date as used on lots and tax events. Transactions carry a full
/// timestamp; everything downstream of ordering only needs the day.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Date {
	year: i32,
	month: u8,
	day: u8,
}

/// Contains the number of days between two dates, always in positive terms.
/// Designed for convenient printing in human-readable terms.
pub struct Duration {
	years: u32,
	months: u8,
	days: u8,
	total_days: u32,
}

impl fmt::Display for Duration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.total_days == 0 {
			return write!(f, "0d");
		}

		let mut components = Vec::new();
		if self.years > 0 {
			components.push(format!("{}y", self.years));
		}
		if self.months > 0 {
			components.push(format!("{}m", self.months));
		}
		if self.days > 0 {
			components.push(format!("{}d", self.days));
		}

		write!(f, "{}", components.join(" "))
	}
}

impl Date {
	pub fn new(year: i32, month: u8, day: u8) -> Result<Date, Error> {
		if !Date::is_valid_date(year, month, day) {
			bail!("Invalid date: {:04}-{:02}-{:02}", year, month, day);
		}
		Ok(Date { year, month, day })
	}

	/// Parses "YYYY-MM-DD" or the compact "YYYYMMDD" form used by broker
	/// exports.
	pub fn parse(date_str: &str) -> Result<Date, Error> {
		let s = date_str.trim();
		let (year, month, day) = if s.contains('-') {
			let parts: Vec<&str> = s.split('-').collect();
			if parts.len() != 3 {
				bail!("Date format must be YYYY-MM-DD: {}", s);
			}
			(
				parts[0].parse::<i32>()?,
				parts[1].parse::<u8>()?,
				parts[2].parse::<u8>()?,
			)
		} else if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
			(s[0..4].parse::<i32>()?, s[4..6].parse::<u8>()?, s[6..8].parse::<u8>()?)
		} else {
			bail!("Date format must be YYYY-MM-DD: {}", s);
		};

		Date::new(year, month, day)
	}

	/// January 1 of the given year, the day deferred charges are recognised.
	pub fn first_of_year(year: i32) -> Date {
		Date {
			year,
			month: 1,
			day: 1,
		}
	}

	pub fn year(&self) -> i32 {
		self.year
	}

	pub fn month(&self) -> u8 {
		self.month
	}

	pub fn day(&self) -> u8 {
		self.day
	}

	/// Calculate the duration in calendar years, months, and days, and the
	/// total number of days, between two dates
	pub fn until(&self, other: &Date) -> Duration {
		let (earlier, later) = if self < other {
			(self, other)
		} else {
			(other, self)
		};

		let mut year_diff = later.year - earlier.year;
		let mut month_diff = later.month as i32 - earlier.month as i32;
		let mut day_diff = later.day as i32 - earlier.day as i32;

		if day_diff < 0 {
			month_diff -= 1;
			let days_in_prev_month =
				Date::days_in_month(earlier.year, earlier.month);
			day_diff += days_in_prev_month as i32;
		}

		if month_diff < 0 {
			year_diff -= 1;
			month_diff += 12;
		}

		Duration {
			years: year_diff as u32,
			months: month_diff as u8,
			days: day_diff as u8,
			total_days: Date::days_between(earlier, later),
		}
	}

	fn days_between(start: &Date, end: &Date) -> u32 {
		let days_in_start_year =
			Date::days_since_year_start(start.year, start.month, start.day);
		let days_in_end_year =
			Date::days_since_year_start(end.year, end.month, end.day);

		let days_in_full_years = (start.year..end.year)
			.map(|year| if Date::is_leap_year(year) { 366 } else { 365 })
			.sum::<u32>();

		days_in_full_years + days_in_end_year - days_in_start_year
	}

	fn days_since_year_start(year: i32, month: u8, day: u8) -> u32 {
		let mut days = 0;
		for m in 1..month {
			days += Date::days_in_month(year, m) as u32;
		}
		days + day as u32
	}

	fn is_leap_year(year: i32) -> bool {
		(year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
	}

	fn days_in_month(year: i32, month: u8) -> u8 {
		match month {
			1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
			4 | 6 | 9 | 11 => 30,
			2 => {
				if Date::is_leap_year(year) {
					29
				} else {
					28
				}
			},
			_ => 0,
		}
	}

	fn is_valid_date(year: i32, month: u8, day: u8) -> bool {
		if year < 1 || !(1..=12).contains(&month) {
			return false;
		}
		day >= 1 && day <= Date::days_in_month(year, month)
	}
}

impl From<NaiveDate> for Date {
	fn from(value: NaiveDate) -> Self {
		Date {
			year: value.year(),
			month: value.month() as u8,
			day: value.day() as u8,
		}
	}
}

impl PartialOrd for Date {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Date {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.year, self.month, self.day).cmp(&(
			other.year,
			other.month,
			other.day,
		))
	}
}

impl fmt::Display for Date {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
	}
}

impl Serialize for Date {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}
