//! HTTP response bodies not covered by the application DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderId, RecommendationId};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers, "degraded" otherwise.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Whether the broker session is live.
    pub session_connected: bool,
    /// Whether the store answered a ping.
    pub database_ok: bool,
}

/// Response of a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOrderResponse {
    /// Always true.
    pub success: bool,
    /// Deleted id.
    pub order_id: OrderId,
}

/// Response after storing a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationCreatedResponse {
    /// Always true.
    pub success: bool,
    /// New row id.
    pub recommendation_id: RecommendationId,
}
