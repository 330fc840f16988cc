//! Trait review entity - a proposed replacement of a character's trait values

use chrono::{DateTime, Utc};

use crate::domain::errors::EngineError;
use crate::domain::value_objects::{CharacterId, TraitReviewId, TraitValueRecord, UserId};

/// Where a proposed change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewSource {
    /// Bulk import from an external masterlist
    Import,
    /// Make-your-own submission
    Myo,
    /// Direct edit by an owner or moderator
    UserEdit,
}

impl ReviewSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::Import => "import",
            ReviewSource::Myo => "myo",
            ReviewSource::UserEdit => "user_edit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import" => Some(ReviewSource::Import),
            "myo" => Some(ReviewSource::Myo),
            "user_edit" => Some(ReviewSource::UserEdit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a review. Pending is the only state that accepts
/// transitions; the three resolved states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Reverted,
}

impl ReviewStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Reverted => "reverted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            "reverted" => Some(ReviewStatus::Reverted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending or resolved change to one character's trait values. Both
/// snapshots are captured at proposal time and never rewritten, so the
/// review stays meaningful even after the catalog moves on.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitReview {
    pub id: TraitReviewId,
    pub subject_id: CharacterId,
    pub source: ReviewSource,
    /// The subject's values as they were when the review was opened
    pub previous_values: Vec<TraitValueRecord>,
    /// The full replacement value set being proposed
    pub proposed_values: Vec<TraitValueRecord>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolver_id: Option<UserId>,
    pub resolution_reason: Option<String>,
}

impl TraitReview {
    pub fn new(
        subject_id: CharacterId,
        source: ReviewSource,
        previous_values: Vec<TraitValueRecord>,
        proposed_values: Vec<TraitValueRecord>,
    ) -> Self {
        Self {
            id: TraitReviewId::new(),
            subject_id,
            source,
            previous_values,
            proposed_values,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            resolver_id: None,
            resolution_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Mark the review approved. Fails once resolved.
    pub fn approve(&mut self, resolver_id: UserId) -> Result<(), EngineError> {
        self.mark_resolved(ReviewStatus::Approved, resolver_id, None)
    }

    /// Mark the review rejected with the moderator's reason.
    pub fn reject(
        &mut self,
        resolver_id: UserId,
        reason: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.mark_resolved(ReviewStatus::Rejected, resolver_id, Some(reason.into()))
    }

    /// Mark the review reverted with the moderator's reason.
    pub fn revert(
        &mut self,
        resolver_id: UserId,
        reason: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.mark_resolved(ReviewStatus::Reverted, resolver_id, Some(reason.into()))
    }

    fn mark_resolved(
        &mut self,
        status: ReviewStatus,
        resolver_id: UserId,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        if !self.is_pending() {
            return Err(EngineError::ReviewAlreadyResolved(self.id));
        }
        self.status = status;
        self.resolved_at = Some(Utc::now());
        self.resolver_id = Some(resolver_id);
        self.resolution_reason = reason;
        Ok(())
    }
}
