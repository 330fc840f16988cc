//! Domain events - Notifications of significant state changes
//!
//! Review resolutions are the engine's outward-facing moments; the review
//! service hands these to the configured notifier after the store commit.

use chrono::{DateTime, Utc};

use crate::domain::entities::ReviewSource;
use crate::domain::value_objects::{CharacterId, TraitReviewId, UserId};

/// Base data for all events
#[derive(Debug, Clone)]
pub struct EventMetadata {
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Optional correlation ID for tracing
    pub correlation_id: Option<String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }
}

/// Events emitted when a trait review reaches a resolved state
#[derive(Debug, Clone)]
pub enum ReviewEvent {
    /// A review was approved and its proposed values applied
    TraitChangesApproved {
        metadata: EventMetadata,
        review_id: TraitReviewId,
        subject_id: CharacterId,
        source: ReviewSource,
        resolver_id: UserId,
    },

    /// A review was rejected; the subject's values are untouched
    TraitChangesRejected {
        metadata: EventMetadata,
        review_id: TraitReviewId,
        subject_id: CharacterId,
        source: ReviewSource,
        resolver_id: UserId,
        reason: String,
    },
}

impl ReviewEvent {
    /// Get the metadata for this event
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            ReviewEvent::TraitChangesApproved { metadata, .. } => metadata,
            ReviewEvent::TraitChangesRejected { metadata, .. } => metadata,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            ReviewEvent::TraitChangesApproved { .. } => "TraitChangesApproved",
            ReviewEvent::TraitChangesRejected { .. } => "TraitChangesRejected",
        }
    }

    pub fn review_id(&self) -> TraitReviewId {
        match self {
            ReviewEvent::TraitChangesApproved { review_id, .. } => *review_id,
            ReviewEvent::TraitChangesRejected { review_id, .. } => *review_id,
        }
    }

    pub fn subject_id(&self) -> CharacterId {
        match self {
            ReviewEvent::TraitChangesApproved { subject_id, .. } => *subject_id,
            ReviewEvent::TraitChangesRejected { subject_id, .. } => *subject_id,
        }
    }
}
