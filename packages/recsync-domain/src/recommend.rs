use ahash::{AHashMap, AHashSet};
use time::OffsetDateTime;

use crate::{
	aggregate::ScoreAggregate,
	record::{ItemMetadata, ItemRecord, LinkRecord, Recommendation, RecommendedItem},
	smoothing::ScoredItem,
	time_serde,
};

/// O(1) item metadata lookup built from the items and links tables.
#[derive(Debug, Default)]
pub struct MetadataIndex {
	entries: AHashMap<i64, ItemMetadata>,
}
impl MetadataIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_parts(items: &[ItemRecord], links: &[LinkRecord]) -> Self {
		let mut index = Self::new();

		for item in items {
			let title = (!item.title.is_empty()).then(|| item.title.clone());

			index.entry(item.item_id).title = title;
		}
		for link in links {
			if link.tmdb_id.is_some() {
				index.entry(link.item_id).external_id = link.tmdb_id;
			}
		}

		index
	}

	pub fn insert(&mut self, metadata: ItemMetadata) {
		self.entries.insert(metadata.item_id, metadata);
	}

	pub fn get(&self, item_id: i64) -> Option<&ItemMetadata> {
		self.entries.get(&item_id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn entry(&mut self, item_id: i64) -> &mut ItemMetadata {
		self.entries
			.entry(item_id)
			.or_insert_with(|| ItemMetadata { item_id, ..ItemMetadata::default() })
	}
}

/// Walks one global ranking per user, skipping observed items, until `top_n` are collected.
pub struct RecommendationBuilder<'a> {
	ranking: &'a [ScoredItem],
	metadata: &'a MetadataIndex,
	top_n: usize,
	score_decimals: u32,
}
impl<'a> RecommendationBuilder<'a> {
	/// `ranking` must already be in [`ScoredItem::ranking_order`].
	pub fn new(
		ranking: &'a [ScoredItem],
		metadata: &'a MetadataIndex,
		top_n: usize,
		score_decimals: u32,
	) -> Self {
		Self { ranking, metadata, top_n, score_decimals }
	}

	pub fn build_for(
		&self,
		user_id: i64,
		observed: &AHashSet<i64>,
		generated_at: OffsetDateTime,
	) -> Recommendation {
		let items = self
			.ranking
			.iter()
			.filter(|scored| !observed.contains(&scored.item_id))
			.take(self.top_n)
			.map(|scored| {
				let metadata = self.metadata.get(scored.item_id);

				RecommendedItem {
					item_id: scored.item_id,
					score: round_score(scored.score, self.score_decimals),
					title: metadata.and_then(|metadata| metadata.title.clone()),
					external_id: metadata.and_then(|metadata| metadata.external_id),
				}
			})
			.collect();

		Recommendation { user_id, items, generated_at: time_serde::to_utc_seconds(generated_at) }
	}

	/// One recommendation per observed user, in ascending user id order.
	pub fn build_all(
		&self,
		aggregate: &ScoreAggregate,
		generated_at: OffsetDateTime,
	) -> Vec<Recommendation> {
		let empty = AHashSet::new();

		aggregate
			.user_ids()
			.into_iter()
			.map(|user_id| {
				let observed = aggregate.observed(user_id).unwrap_or(&empty);

				self.build_for(user_id, observed, generated_at)
			})
			.collect()
	}
}

pub fn round_score(score: f64, decimals: u32) -> f64 {
	let factor = 10_f64.powi(decimals as i32);

	(score * factor).round() / factor
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use crate::{record::InteractionRecord, smoothing::BayesianSmoother};

	fn record(user_id: i64, item_id: i64, value: f64) -> InteractionRecord {
		InteractionRecord { user_id, item_id, value, timestamp: None }
	}

	#[test]
	fn worked_example_excludes_observed_items() {
		let records = [record(1, 10, 5.0), record(1, 11, 3.0), record(2, 10, 4.0)];
		let aggregate = ScoreAggregate::from_records(&records);
		let ranking = BayesianSmoother::new(10.0, 4.0).rank(&aggregate);
		let metadata = MetadataIndex::from_parts(
			&[ItemRecord { item_id: 11, title: "Jumanji (1995)".to_string(), genres: String::new() }],
			&[LinkRecord { item_id: 11, imdb_id: None, tmdb_id: Some(8844) }],
		);
		let builder = RecommendationBuilder::new(&ranking, &metadata, 20, 4);
		let recs = builder.build_all(&aggregate, datetime!(2024-01-02 03:04:05.678 UTC));

		assert_eq!(recs.len(), 2);
		assert_eq!(recs[0].user_id, 1);
		assert!(recs[0].items.is_empty());
		assert_eq!(recs[1].user_id, 2);
		assert_eq!(
			recs[1].items,
			vec![RecommendedItem {
				item_id: 11,
				score: 3.9091,
				title: Some("Jumanji (1995)".to_string()),
				external_id: Some(8844),
			}]
		);
		assert_eq!(recs[1].generated_at, datetime!(2024-01-02 03:04:05 UTC));
	}

	#[test]
	fn list_is_bounded_by_top_n() {
		let mut records = vec![record(1, 1, 1.0)];

		records.extend((2..=30).map(|item_id| record(2, item_id, 4.0)));

		let aggregate = ScoreAggregate::from_records(&records);
		let ranking = BayesianSmoother::for_aggregate(&aggregate, 50.0, 3.5).rank(&aggregate);
		let metadata = MetadataIndex::new();
		let builder = RecommendationBuilder::new(&ranking, &metadata, 5, 5);
		let observed = aggregate.observed(1).cloned().unwrap_or_default();
		let rec = builder.build_for(1, &observed, datetime!(2024-01-01 0:00 UTC));
		let ids: Vec<i64> = rec.items.iter().map(|item| item.item_id).collect();

		assert_eq!(ids, vec![2, 3, 4, 5, 6]);
		assert!(rec.items.iter().all(|item| item.title.is_none()));
	}

	#[test]
	fn rounding_keeps_requested_decimals() {
		assert_eq!(round_score(4.083_333_33, 5), 4.08333);
		assert_eq!(round_score(3.909_090_9, 4), 3.9091);
	}
}
