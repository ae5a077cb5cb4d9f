use std::cmp::Ordering;

use crate::aggregate::{ItemAggregate, ScoreAggregate};

/// Shrinks each item's mean toward the global mean by `m / (count + m)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BayesianSmoother {
	prior_weight: f64,
	global_mean: f64,
}
impl BayesianSmoother {
	pub fn new(prior_weight: f64, global_mean: f64) -> Self {
		Self { prior_weight, global_mean }
	}

	pub fn for_aggregate(aggregate: &ScoreAggregate, prior_weight: f64, prior_mean: f64) -> Self {
		Self::new(prior_weight, aggregate.global_mean(prior_mean))
	}

	pub fn prior_weight(&self) -> f64 {
		self.prior_weight
	}

	pub fn global_mean(&self) -> f64 {
		self.global_mean
	}

	pub fn score(&self, item: &ItemAggregate) -> f64 {
		let count = item.count as f64;
		let m = self.prior_weight;

		(count / (count + m)) * item.mean() + (m / (count + m)) * self.global_mean
	}

	/// Scores every aggregated item and returns them in ranking order.
	pub fn rank(&self, aggregate: &ScoreAggregate) -> Vec<ScoredItem> {
		let mut ranking: Vec<ScoredItem> = aggregate
			.items()
			.map(|item| ScoredItem {
				item_id: item.item_id,
				count: item.count,
				mean: item.mean(),
				score: self.score(item),
			})
			.collect();

		ranking.sort_by(ScoredItem::ranking_order);

		ranking
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredItem {
	pub item_id: i64,
	pub count: u64,
	pub mean: f64,
	pub score: f64,
}
impl ScoredItem {
	/// Score descending, then item id ascending.
	pub fn ranking_order(left: &Self, right: &Self) -> Ordering {
		right.score.total_cmp(&left.score).then_with(|| left.item_id.cmp(&right.item_id))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::InteractionRecord;

	fn aggregate(count: u64, mean: f64) -> ItemAggregate {
		ItemAggregate { item_id: 1, count, sum: mean * count as f64 }
	}

	#[test]
	fn matches_worked_example() {
		let smoother = BayesianSmoother::new(10.0, 4.0);

		assert!((smoother.score(&aggregate(2, 4.5)) - 4.083_333).abs() < 1e-5);
		assert!((smoother.score(&aggregate(1, 3.0)) - 3.909_091).abs() < 1e-5);
	}

	#[test]
	fn stays_between_item_mean_and_global_mean() {
		let smoother = BayesianSmoother::new(50.0, 3.5);

		for count in [1_u64, 2, 7, 50, 400, 10_000] {
			for mean in [0.5, 3.5, 5.0] {
				let score = smoother.score(&aggregate(count, mean));
				let low = mean.min(3.5) - 1e-9;
				let high = mean.max(3.5) + 1e-9;

				assert!((low..=high).contains(&score), "count={count} mean={mean} score={score}");
			}
		}
	}

	#[test]
	fn converges_to_item_mean_with_many_observations() {
		let smoother = BayesianSmoother::new(50.0, 3.0);
		let few = smoother.score(&aggregate(5, 5.0));
		let many = smoother.score(&aggregate(5_000_000, 5.0));

		assert!((many - 5.0).abs() < 1e-4);
		assert!((5.0 - many) < (5.0 - few));
	}

	#[test]
	fn ties_rank_by_item_id() {
		let records = [
			InteractionRecord { user_id: 1, item_id: 30, value: 4.0, timestamp: None },
			InteractionRecord { user_id: 1, item_id: 20, value: 4.0, timestamp: None },
			InteractionRecord { user_id: 1, item_id: 10, value: 4.0, timestamp: None },
			InteractionRecord { user_id: 2, item_id: 40, value: 5.0, timestamp: None },
		];
		let aggregate = ScoreAggregate::from_records(&records);
		let ranking = BayesianSmoother::for_aggregate(&aggregate, 10.0, 3.5).rank(&aggregate);
		let ids: Vec<i64> = ranking.iter().map(|item| item.item_id).collect();

		assert_eq!(ids, vec![40, 10, 20, 30]);
	}
}
