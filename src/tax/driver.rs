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
use crate::investment::transaction::Transaction;
use crate::tax::engine::TaxEngine;
use log::{info, warn};
use std::ops::RangeInclusive;

/// Feeds a chronologically sorted transaction stream through the engine,
/// closing each year after its last transaction. Runs through the year after
/// the last transaction, so lots still held then get their deemed
/// distribution, or through `end` if that is later.
///
/// Returns the years closed, or None if there was nothing to process.
pub fn run(
	engine: &mut TaxEngine,
	transactions: &[Transaction],
	end: Option<i32>,
) -> Option<RangeInclusive<i32>> {
	let first_year = transactions.iter().map(|tx| tx.year()).min()?;
	let last_year = transactions.iter().map(|tx| tx.year()).max()? + 1;
	let last_year = end.map_or(last_year, |end| end.max(last_year));

	let mut pending = transactions.iter().peekable();
	let mut previous = None;
	for year in first_year..=last_year {
		while let Some(tx) = pending.next_if(|tx| tx.year() <= year) {
			if previous.is_some_and(|ts| tx.timestamp < ts) {
				warn!(
					"{} {} is out of order, processed at {}",
					tx.id, tx.timestamp, year
				);
			}
			previous = Some(tx.timestamp);
			engine.process(tx);
		}
		if !engine.is_closed(year) {
			engine.close_year(year);
		}
	}

	info!(
		"Processed {} transactions over {}-{}: {} events, {} faults",
		transactions.len(),
		first_year,
		last_year,
		engine.ledger().len(),
		engine.faults().len()
	);
	Some(first_year..=last_year)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::investment::transaction::TransactionKind;
	use crate::tax::engine::tests::{reference, tx, ISIN};
	use crate::tax::event::EventKind;
	use crate::tax::fault::FaultCategory;
	use rust_decimal::Decimal;
	use rust_decimal_macros::dec;

	#[test]
	fn test_closes_year_after_last() {
		let (instruments, rates, prices) = reference();
		let mut engine = TaxEngine::new(&instruments, &rates, &prices);
		let transactions = vec![tx(
			"B1",
			"2021-01-10 10:00:00",
			TransactionKind::Buy,
			dec!(100),
			dec!(-1000),
			Decimal::ZERO,
		)];

		let years = run(&mut engine, &transactions, None).unwrap();
		assert_eq!(years, 2021..=2022);
		assert!(engine.is_closed(2022));

		let years: Vec<i32> = engine
			.ledger()
			.query(None, Some(EventKind::DeemedDistribution))
			.map(|e| e.year)
			.collect();
		assert_eq!(years, vec![2022, 2023]);
	}

	#[test]
	fn test_sale_sees_prior_year_offset() {
		let (instruments, rates, prices) = reference();
		let mut engine = TaxEngine::new(&instruments, &rates, &prices);
		let transactions = vec![
			tx(
				"B1",
				"2021-01-10 10:00:00",
				TransactionKind::Buy,
				dec!(100),
				dec!(-1000),
				Decimal::ZERO,
			),
			tx(
				"S1",
				"2022-03-01 10:00:00",
				TransactionKind::Sell,
				dec!(-100),
				dec!(1200),
				dec!(-5),
			),
		];

		run(&mut engine, &transactions, Some(2024));
		let sale = engine
			.ledger()
			.query(Some(2022), Some(EventKind::Sell))
			.next()
			.unwrap();
		assert_eq!(sale.raw_profit, dec!(188));
		assert!(engine.is_closed(2024));
		assert_eq!(engine.ledger().len(), 2);
	}

	#[test]
	fn test_quiet_years_still_accrue() {
		let (instruments, mut rates, mut prices) = reference();
		rates.insert(2023, dec!(0.01));
		prices.insert(ISIN, 2023, dec!(11));
		let mut engine = TaxEngine::new(&instruments, &rates, &prices);
		let transactions = vec![
			tx(
				"B1",
				"2021-01-10 10:00:00",
				TransactionKind::Buy,
				dec!(100),
				dec!(-1000),
				Decimal::ZERO,
			),
			tx(
				"S1",
				"2024-03-01 10:00:00",
				TransactionKind::Sell,
				dec!(-100),
				dec!(1200),
				dec!(-5),
			),
		];

		assert_eq!(run(&mut engine, &transactions, None), Some(2021..=2025));

		let charges: Vec<(i32, Decimal)> = engine
			.ledger()
			.query(None, Some(EventKind::DeemedDistribution))
			.map(|e| (e.year, e.raw_profit))
			.collect();
		assert_eq!(charges, vec![(2022, dec!(7)), (2023, dec!(7)), (2024, dec!(7))]);

		let sale = engine
			.ledger()
			.query(Some(2024), Some(EventKind::Sell))
			.next()
			.unwrap();
		assert_eq!(sale.offset_used, dec!(21));
		assert_eq!(sale.raw_profit, dec!(174));
		let missing = engine.faults().by_category(FaultCategory::MissingReferenceData);
		assert_eq!(missing.count(), 0);
	}

	#[test]
	fn test_empty_stream() {
		let (instruments, rates, prices) = reference();
		let mut engine = TaxEngine::new(&instruments, &rates, &prices);
		assert!(run(&mut engine, &[], Some(2022)).is_none());
		assert!(engine.ledger().is_empty());
	}
}
