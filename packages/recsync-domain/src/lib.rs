pub mod aggregate;
pub mod normalize;
pub mod recommend;
pub mod record;
pub mod smoothing;
pub mod time_serde;

pub use aggregate::{ItemAggregate, ScoreAggregate};
pub use normalize::{NormalizePolicy, NormalizeStats, Normalizer, RawRow, SkipReason};
pub use recommend::{MetadataIndex, RecommendationBuilder};
pub use record::{
	InteractionRecord, ItemMetadata, ItemRecord, LinkRecord, RawRatingRecord, Recommendation,
	RecommendedItem,
};
pub use smoothing::{BayesianSmoother, ScoredItem};
