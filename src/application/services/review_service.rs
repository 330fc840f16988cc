//! Review Service - Application service for the trait change workflow
//!
//! Every replacement of a character's trait values can flow through a
//! review: propose captures before/after snapshots, a moderator resolves,
//! and the store applies the winning snapshot atomically with the status
//! transition. Snapshots are frozen at proposal time; approving or
//! reverting re-validates them against the catalog as it is then.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::ports::outbound::{
    CharacterRepositoryPort, ModerationAuthorizerPort, PendingReviewFilter, PendingReviewPage,
    ReviewNotifierPort, TraitCatalogRepositoryPort, TraitReviewRepositoryPort,
    VariantConfigRepositoryPort,
};
use crate::domain::entities::{ReviewSource, TraitDefinition, TraitReview};
use crate::domain::errors::EngineError;
use crate::domain::events::{EventMetadata, ReviewEvent};
use crate::domain::services::{diff_trait_values, TraitDiff};
use crate::domain::value_objects::{
    CharacterId, EnumValueId, SpeciesVariantId, TraitId, TraitReviewId, TraitValue,
    TraitValueRecord, UserId,
};

/// Request to open a review against a character
#[derive(Debug, Clone)]
pub struct ProposeChangesRequest {
    pub subject_id: CharacterId,
    pub source: ReviewSource,
    /// The full replacement value set, not a patch
    pub proposed_values: Vec<TraitValueRecord>,
}

/// Service for proposing and resolving trait change reviews
pub struct ReviewService {
    reviews: Arc<dyn TraitReviewRepositoryPort>,
    characters: Arc<dyn CharacterRepositoryPort>,
    catalog: Arc<dyn TraitCatalogRepositoryPort>,
    config: Arc<dyn VariantConfigRepositoryPort>,
    authorizer: Arc<dyn ModerationAuthorizerPort>,
    notifier: Arc<dyn ReviewNotifierPort>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn TraitReviewRepositoryPort>,
        characters: Arc<dyn CharacterRepositoryPort>,
        catalog: Arc<dyn TraitCatalogRepositoryPort>,
        config: Arc<dyn VariantConfigRepositoryPort>,
        authorizer: Arc<dyn ModerationAuthorizerPort>,
        notifier: Arc<dyn ReviewNotifierPort>,
    ) -> Self {
        Self {
            reviews,
            characters,
            catalog,
            config,
            authorizer,
            notifier,
        }
    }

    /// Open a review. The subject's current values become the previous
    /// snapshot; a subject can only carry one pending review at a time.
    #[instrument(
        skip(self, request),
        fields(subject_id = %request.subject_id, source = %request.source)
    )]
    pub async fn propose_changes(
        &self,
        request: ProposeChangesRequest,
    ) -> Result<TraitReview, EngineError> {
        let character = self
            .characters
            .get(request.subject_id)
            .await?
            .ok_or(EngineError::CharacterNotFound(request.subject_id))?;

        let previous_values = flatten_values(self.characters.get_values(character.id).await?);

        self.warn_disabled_enum_refs(character.species_variant_id, &request.proposed_values)
            .await?;

        let review = TraitReview::new(
            request.subject_id,
            request.source,
            previous_values,
            request.proposed_values,
        );
        self.reviews.create_pending(&review).await?;

        info!(
            review_id = %review.id,
            proposed = review.proposed_values.len(),
            "Opened review for character: {}",
            character.name
        );
        Ok(review)
    }

    /// Approve a pending review, applying its proposed values to the
    /// subject. The snapshot is validated against the current catalog; a
    /// failure leaves the review pending and the values untouched.
    #[instrument(skip(self), fields(review_id = %review_id, resolver_id = %resolver_id))]
    pub async fn approve_changes(
        &self,
        review_id: TraitReviewId,
        resolver_id: UserId,
    ) -> Result<TraitReview, EngineError> {
        let review = self.get_review(review_id).await?;
        self.authorize(resolver_id, review.subject_id).await?;

        let resolved = self.reviews.approve(review_id, resolver_id).await?;

        info!(
            review_id = %review_id,
            subject_id = %resolved.subject_id,
            "Approved review"
        );
        self.dispatch(ReviewEvent::TraitChangesApproved {
            metadata: EventMetadata::default(),
            review_id: resolved.id,
            subject_id: resolved.subject_id,
            source: resolved.source,
            resolver_id,
        })
        .await;
        Ok(resolved)
    }

    /// Reject a pending review. The subject's values are not touched.
    #[instrument(skip(self, reason), fields(review_id = %review_id, resolver_id = %resolver_id))]
    pub async fn reject_changes(
        &self,
        review_id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::MissingResolutionReason);
        }

        let review = self.get_review(review_id).await?;
        self.authorize(resolver_id, review.subject_id).await?;

        let resolved = self.reviews.reject(review_id, resolver_id, reason).await?;

        info!(
            review_id = %review_id,
            subject_id = %resolved.subject_id,
            "Rejected review"
        );
        self.dispatch(ReviewEvent::TraitChangesRejected {
            metadata: EventMetadata::default(),
            review_id: resolved.id,
            subject_id: resolved.subject_id,
            source: resolved.source,
            resolver_id,
            reason: reason.to_string(),
        })
        .await;
        Ok(resolved)
    }

    /// Revert a pending review, re-applying its previous snapshot to the
    /// subject. The snapshot wins over any edits made since the review
    /// was opened.
    #[instrument(skip(self, reason), fields(review_id = %review_id, resolver_id = %resolver_id))]
    pub async fn revert_changes(
        &self,
        review_id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::MissingResolutionReason);
        }

        let review = self.get_review(review_id).await?;
        self.authorize(resolver_id, review.subject_id).await?;

        let resolved = self.reviews.revert(review_id, resolver_id, reason).await?;

        info!(
            review_id = %review_id,
            subject_id = %resolved.subject_id,
            "Reverted review"
        );
        Ok(resolved)
    }

    #[instrument(skip(self))]
    pub async fn get_review(&self, id: TraitReviewId) -> Result<TraitReview, EngineError> {
        self.reviews
            .get(id)
            .await?
            .ok_or(EngineError::ReviewNotFound(id))
    }

    /// Page through the moderation queue, oldest first
    #[instrument(skip(self, filter), fields(offset = offset, limit = limit))]
    pub async fn list_pending(
        &self,
        filter: &PendingReviewFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PendingReviewPage, EngineError> {
        debug!(offset = offset, limit = limit, "Listing pending reviews");
        self.reviews.list_pending(filter, offset, limit).await
    }

    /// Diff a review's two snapshots, trait by trait
    #[instrument(skip(self))]
    pub async fn review_diff(&self, id: TraitReviewId) -> Result<Vec<TraitDiff>, EngineError> {
        let review = self.get_review(id).await?;
        let definitions = self
            .definitions_for(&review.previous_values, &review.proposed_values)
            .await?;
        Ok(diff_trait_values(
            &definitions,
            &review.previous_values,
            &review.proposed_values,
        ))
    }

    /// Diff a would-be proposal against the subject's current values
    /// without opening a review
    #[instrument(skip(self, proposed_values), fields(subject_id = %subject_id))]
    pub async fn preview_diff(
        &self,
        subject_id: CharacterId,
        proposed_values: &[TraitValueRecord],
    ) -> Result<Vec<TraitDiff>, EngineError> {
        self.characters
            .get(subject_id)
            .await?
            .ok_or(EngineError::CharacterNotFound(subject_id))?;

        let previous_values = flatten_values(self.characters.get_values(subject_id).await?);
        let definitions = self
            .definitions_for(&previous_values, proposed_values)
            .await?;
        Ok(diff_trait_values(
            &definitions,
            &previous_values,
            proposed_values,
        ))
    }

    async fn authorize(
        &self,
        actor_id: UserId,
        subject_id: CharacterId,
    ) -> Result<(), EngineError> {
        if self.authorizer.can_moderate(actor_id, subject_id).await {
            Ok(())
        } else {
            Err(EngineError::NotAuthorized {
                actor: actor_id,
                subject: subject_id,
            })
        }
    }

    /// Deliver a resolution event. Failures are logged and swallowed so a
    /// broken notifier cannot undo a committed resolution.
    async fn dispatch(&self, event: ReviewEvent) {
        if let Err(err) = self.notifier.notify(&event).await {
            warn!(
                event_type = event.event_type(),
                review_id = %event.review_id(),
                "Failed to deliver review notification: {}",
                err
            );
        }
    }

    /// Definitions for every trait named in either snapshot. Traits
    /// deleted since proposal are simply absent, which makes the diff
    /// skip their rows.
    async fn definitions_for(
        &self,
        previous: &[TraitValueRecord],
        proposed: &[TraitValueRecord],
    ) -> Result<BTreeMap<TraitId, TraitDefinition>, EngineError> {
        let mut definitions = BTreeMap::new();
        for record in previous.iter().chain(proposed) {
            if definitions.contains_key(&record.trait_id) {
                continue;
            }
            if let Some(definition) = self.catalog.get_trait(record.trait_id).await? {
                definitions.insert(record.trait_id, definition);
            }
        }
        Ok(definitions)
    }

    /// Soft check at proposal time: flag enum values the subject's variant
    /// has not enabled. Traits with no enabled options at all are treated
    /// as not curated for the variant and skipped.
    async fn warn_disabled_enum_refs(
        &self,
        variant_id: SpeciesVariantId,
        proposed: &[TraitValueRecord],
    ) -> Result<(), EngineError> {
        let enabled: BTreeSet<EnumValueId> = self
            .config
            .list_settings(variant_id)
            .await?
            .into_iter()
            .map(|s| s.enum_value_id)
            .collect();

        let mut curated_traits: BTreeSet<TraitId> = BTreeSet::new();
        for enum_value_id in &enabled {
            if let Some(value) = self.catalog.get_enum_value(*enum_value_id).await? {
                curated_traits.insert(value.trait_id);
            }
        }

        for record in proposed {
            if let TraitValue::Enum(enum_value_id) = record.value {
                if !enabled.contains(&enum_value_id) && curated_traits.contains(&record.trait_id) {
                    warn!(
                        trait_id = %record.trait_id,
                        enum_value_id = %enum_value_id,
                        variant_id = %variant_id,
                        "Proposed enum value is not enabled for the subject's variant"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Flatten grouped values into the flat record form reviews snapshot.
/// BTreeMap iteration keeps the result deterministic.
fn flatten_values(grouped: BTreeMap<TraitId, Vec<TraitValue>>) -> Vec<TraitValueRecord> {
    grouped
        .into_iter()
        .flat_map(|(trait_id, values)| {
            values
                .into_iter()
                .map(move |value| TraitValueRecord::new(trait_id, value))
        })
        .collect()
}
