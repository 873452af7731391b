//! Shared value objects.

mod identifiers;

pub use identifiers::{OrderId, RecommendationId, VenueOrderId};
