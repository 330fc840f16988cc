//! Moderation collaborator ports - authorization and notification hooks
//!
//! Permission decisions and outbound notifications live outside the
//! engine. Hosts inject implementations of these traits; tests use stubs.

use async_trait::async_trait;

use crate::domain::events::ReviewEvent;
use crate::domain::value_objects::{CharacterId, UserId};

/// Decides whether an actor may resolve reviews for a subject
#[async_trait]
pub trait ModerationAuthorizerPort: Send + Sync {
    async fn can_moderate(&self, actor_id: UserId, subject_id: CharacterId) -> bool;
}

/// Receives review resolution events after the store has committed.
/// Delivery failures are logged by the review service, never propagated,
/// so a broken notifier cannot undo a resolution.
#[async_trait]
pub trait ReviewNotifierPort: Send + Sync {
    async fn notify(&self, event: &ReviewEvent) -> anyhow::Result<()>;
}
