use ahash::{AHashMap, AHashSet};

use crate::record::InteractionRecord;

/// Running totals for one item. Only items with at least one observation exist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemAggregate {
	pub item_id: i64,
	pub count: u64,
	pub sum: f64,
}
impl ItemAggregate {
	pub fn mean(&self) -> f64 {
		if self.count == 0 {
			return 0.0;
		}

		self.sum / self.count as f64
	}
}

/// Per-item totals and per-user observed sets, rebuilt from scratch on every run.
#[derive(Debug, Default)]
pub struct ScoreAggregate {
	items: AHashMap<i64, ItemAggregate>,
	observed: AHashMap<i64, AHashSet<i64>>,
	total_sum: f64,
	total_count: u64,
}
impl ScoreAggregate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_records<'a, I>(records: I) -> Self
	where
		I: IntoIterator<Item = &'a InteractionRecord>,
	{
		let mut aggregate = Self::new();

		for record in records {
			aggregate.observe(record);
		}

		aggregate
	}

	pub fn observe(&mut self, record: &InteractionRecord) {
		let item = self.items.entry(record.item_id).or_insert(ItemAggregate {
			item_id: record.item_id,
			count: 0,
			sum: 0.0,
		});

		item.count += 1;
		item.sum += record.value;

		self.observed.entry(record.user_id).or_default().insert(record.item_id);

		self.total_sum += record.value;
		self.total_count += 1;
	}

	/// Mean over every observation, or `prior_mean` when there are none.
	pub fn global_mean(&self, prior_mean: f64) -> f64 {
		if self.total_count == 0 {
			return prior_mean;
		}

		self.total_sum / self.total_count as f64
	}

	pub fn item(&self, item_id: i64) -> Option<&ItemAggregate> {
		self.items.get(&item_id)
	}

	/// Unordered.
	pub fn items(&self) -> impl Iterator<Item = &ItemAggregate> {
		self.items.values()
	}

	pub fn observed(&self, user_id: i64) -> Option<&AHashSet<i64>> {
		self.observed.get(&user_id)
	}

	/// Users with at least one observation, ascending.
	pub fn user_ids(&self) -> Vec<i64> {
		let mut users: Vec<i64> = self.observed.keys().copied().collect();

		users.sort_unstable();

		users
	}

	pub fn item_count(&self) -> usize {
		self.items.len()
	}

	pub fn user_count(&self) -> usize {
		self.observed.len()
	}

	pub fn interaction_count(&self) -> u64 {
		self.total_count
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(user_id: i64, item_id: i64, value: f64) -> InteractionRecord {
		InteractionRecord { user_id, item_id, value, timestamp: None }
	}

	#[test]
	fn accumulates_items_and_users_in_one_pass() {
		let records = [record(1, 10, 5.0), record(1, 11, 3.0), record(2, 10, 4.0)];
		let aggregate = ScoreAggregate::from_records(&records);
		let item = aggregate.item(10).expect("Item 10 must be aggregated.");

		assert_eq!(item.count, 2);
		assert_eq!(item.sum, 9.0);
		assert_eq!(item.mean(), 4.5);
		assert_eq!(aggregate.global_mean(3.5), 4.0);
		assert_eq!(aggregate.user_ids(), vec![1, 2]);
		assert_eq!(aggregate.observed(1).map(|set| set.len()), Some(2));
		assert_eq!(aggregate.interaction_count(), 3);
	}

	#[test]
	fn empty_input_falls_back_to_prior_mean() {
		let aggregate = ScoreAggregate::new();

		assert_eq!(aggregate.global_mean(3.5), 3.5);
		assert_eq!(aggregate.item_count(), 0);
		assert!(aggregate.user_ids().is_empty());
	}
}
