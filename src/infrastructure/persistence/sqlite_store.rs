//! SQLite storage adapter
//!
//! One pool, schema prepared on startup. Multi-step mutations run inside
//! a transaction; review transitions claim the row with a guarded UPDATE
//! before touching anything else, and a partial unique index backs the
//! one-pending-review-per-subject rule. Value snapshots and trait values
//! are stored as JSON text.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::application::ports::outbound::{
    CharacterRepositoryPort, PendingReviewFilter, PendingReviewPage, TraitCatalogRepositoryPort,
    TraitReviewRepositoryPort, VariantConfigRepositoryPort,
};
use crate::domain::entities::{
    Character, EnumValue, EnumValueSetting, ReviewSource, ReviewStatus, Species, SpeciesVariant,
    TraitDefinition, TraitListEntry, TraitReview,
};
use crate::domain::errors::EngineError;
use crate::domain::services::{plan_dense_reorder, validate_value_set};
use crate::domain::value_objects::{
    CharacterId, EnumValueId, SpeciesId, SpeciesVariantId, TraitId, TraitListEntryId,
    TraitReviewId, TraitValue, TraitValueRecord, TraitValueType, UserId,
};

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

/// Translate a unique-constraint violation into a domain conflict error
fn map_unique(err: sqlx::Error, conflict: impl FnOnce() -> EngineError) -> EngineError {
    match &err {
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            conflict()
        }
        _ => EngineError::Storage(err.to_string()),
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS species (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS species_variants (
        id TEXT PRIMARY KEY,
        species_id TEXT NOT NULL REFERENCES species(id),
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_definitions (
        id TEXT PRIMARY KEY,
        species_id TEXT NOT NULL REFERENCES species(id),
        name TEXT NOT NULL,
        value_type TEXT NOT NULL,
        allows_multiple_values INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS enum_values (
        id TEXT PRIMARY KEY,
        trait_id TEXT NOT NULL REFERENCES trait_definitions(id),
        name TEXT NOT NULL,
        sort_order REAL NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_list_entries (
        id TEXT PRIMARY KEY,
        species_variant_id TEXT NOT NULL REFERENCES species_variants(id),
        trait_id TEXT NOT NULL REFERENCES trait_definitions(id),
        sort_order INTEGER NOT NULL,
        required INTEGER NOT NULL DEFAULT 0,
        value_type TEXT NOT NULL,
        default_value TEXT,
        UNIQUE (species_variant_id, trait_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS enum_value_settings (
        enum_value_id TEXT NOT NULL REFERENCES enum_values(id),
        species_variant_id TEXT NOT NULL REFERENCES species_variants(id),
        PRIMARY KEY (enum_value_id, species_variant_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        species_variant_id TEXT NOT NULL REFERENCES species_variants(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS character_trait_values (
        character_id TEXT NOT NULL REFERENCES characters(id),
        position INTEGER NOT NULL,
        trait_id TEXT NOT NULL,
        value TEXT NOT NULL,
        enum_value_id TEXT,
        PRIMARY KEY (character_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_reviews (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL REFERENCES characters(id),
        source TEXT NOT NULL,
        previous_values TEXT NOT NULL,
        proposed_values TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        resolved_at TEXT,
        resolver_id TEXT,
        resolution_reason TEXT
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_trait_reviews_one_pending
        ON trait_reviews(subject_id) WHERE status = 'pending'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_character_trait_values_enum
        ON character_trait_values(enum_value_id)
    "#,
];

const SELECT_REVIEW: &str = r#"
    SELECT id, subject_id, source, previous_values, proposed_values, status,
           created_at, resolved_at, resolver_id, resolution_reason
    FROM trait_reviews
"#;

/// SQLite storage backend implementing all repository ports
pub struct SqliteTraitStore {
    pool: SqlitePool,
}

impl SqliteTraitStore {
    /// Open the database at `path`, creating the file and its parent
    /// directory when missing, and prepare the schema
    pub async fn connect(path: &str, max_connections: u32) -> anyhow::Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create trait database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))
            .context("Invalid SQLite path")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite trait database")?;
        info!("Connected to SQLite trait database: {}", path);

        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating tables when missing
    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Shared resolution path. Claims the pending row first, so two
    /// moderators racing on the same review leave exactly one winner.
    async fn resolve_review(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        status: ReviewStatus,
        reason: Option<&str>,
    ) -> Result<TraitReview, EngineError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE trait_reviews SET status = ?, resolved_at = ?, resolver_id = ?, \
             resolution_reason = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(resolver_id.to_string())
        .bind(reason)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM trait_reviews WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => EngineError::ReviewAlreadyResolved(id),
                None => EngineError::ReviewNotFound(id),
            });
        }

        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_REVIEW))
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let review = review_from_row(&row)?;

        // a failed snapshot application rolls the claim back too
        match status {
            ReviewStatus::Approved => {
                replace_values_in_tx(&mut tx, review.subject_id, &review.proposed_values).await?;
            }
            ReviewStatus::Reverted => {
                replace_values_in_tx(&mut tx, review.subject_id, &review.previous_values).await?;
            }
            _ => {}
        }

        tx.commit().await?;
        Ok(review)
    }
}

#[async_trait]
impl TraitCatalogRepositoryPort for SqliteTraitStore {
    async fn create_species(&self, species: &Species) -> Result<(), EngineError> {
        sqlx::query("INSERT INTO species (id, name) VALUES (?, ?)")
            .bind(species.id.to_string())
            .bind(&species.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_species(&self, id: SpeciesId) -> Result<Option<Species>, EngineError> {
        let row = sqlx::query("SELECT id, name FROM species WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(species_from_row).transpose()
    }

    async fn create_variant(&self, variant: &SpeciesVariant) -> Result<(), EngineError> {
        sqlx::query("INSERT INTO species_variants (id, species_id, name) VALUES (?, ?, ?)")
            .bind(variant.id.to_string())
            .bind(variant.species_id.to_string())
            .bind(&variant.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_variant(
        &self,
        id: SpeciesVariantId,
    ) -> Result<Option<SpeciesVariant>, EngineError> {
        let row = sqlx::query("SELECT id, species_id, name FROM species_variants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(variant_from_row).transpose()
    }

    async fn create_trait(&self, definition: &TraitDefinition) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO trait_definitions (id, species_id, name, value_type, \
             allows_multiple_values) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(definition.id.to_string())
        .bind(definition.species_id.to_string())
        .bind(&definition.name)
        .bind(definition.value_type.as_str())
        .bind(definition.allows_multiple_values)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_trait(&self, id: TraitId) -> Result<Option<TraitDefinition>, EngineError> {
        let row = sqlx::query(
            "SELECT id, species_id, name, value_type, allows_multiple_values \
             FROM trait_definitions WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(trait_from_row).transpose()
    }

    async fn list_traits(
        &self,
        species_id: SpeciesId,
    ) -> Result<Vec<TraitDefinition>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, species_id, name, value_type, allows_multiple_values \
             FROM trait_definitions WHERE species_id = ? ORDER BY name, id",
        )
        .bind(species_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trait_from_row).collect()
    }

    async fn create_enum_value(&self, value: &EnumValue) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO enum_values (id, trait_id, name, sort_order, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(value.id.to_string())
        .bind(value.trait_id.to_string())
        .bind(&value.name)
        .bind(value.order)
        .bind(value.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_enum_value(&self, id: EnumValueId) -> Result<Option<EnumValue>, EngineError> {
        let row = sqlx::query(
            "SELECT id, trait_id, name, sort_order, created_at FROM enum_values WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(enum_value_from_row).transpose()
    }

    async fn update_enum_value_order(
        &self,
        id: EnumValueId,
        order: f64,
    ) -> Result<EnumValue, EngineError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE enum_values SET sort_order = ? WHERE id = ?")
            .bind(order)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(EngineError::EnumValueNotFound(id));
        }
        let row = sqlx::query(
            "SELECT id, trait_id, name, sort_order, created_at FROM enum_values WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        enum_value_from_row(&row)
    }

    async fn delete_enum_value(&self, id: EnumValueId) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query("SELECT 1 FROM enum_values WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(EngineError::EnumValueNotFound(id));
        }

        sqlx::query("DELETE FROM enum_value_settings WHERE enum_value_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM character_trait_values WHERE enum_value_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM enum_values WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_enum_values(&self, trait_id: TraitId) -> Result<Vec<EnumValue>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, trait_id, name, sort_order, created_at FROM enum_values \
             WHERE trait_id = ?",
        )
        .bind(trait_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        let mut values = rows
            .iter()
            .map(enum_value_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        // ties on sort_order break on created_at then id, same as the catalog
        values.sort_by(|a, b| a.catalog_cmp(b));
        Ok(values)
    }
}

#[async_trait]
impl VariantConfigRepositoryPort for SqliteTraitStore {
    async fn create_entry(&self, entry: &TraitListEntry) -> Result<(), EngineError> {
        let default_value = entry
            .default_value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO trait_list_entries \
             (id, species_variant_id, trait_id, sort_order, required, value_type, default_value) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.species_variant_id.to_string())
        .bind(entry.trait_id.to_string())
        .bind(entry.order)
        .bind(entry.required)
        .bind(entry.value_type.as_str())
        .bind(default_value)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            return Err(map_unique(err, || EngineError::DuplicateEntry {
                variant_id: entry.species_variant_id,
                trait_id: entry.trait_id,
            }));
        }
        Ok(())
    }

    async fn get_entry(
        &self,
        id: TraitListEntryId,
    ) -> Result<Option<TraitListEntry>, EngineError> {
        let row = sqlx::query(
            "SELECT id, species_variant_id, trait_id, sort_order, required, value_type, \
             default_value FROM trait_list_entries WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn get_entry_for_trait(
        &self,
        variant_id: SpeciesVariantId,
        trait_id: TraitId,
    ) -> Result<Option<TraitListEntry>, EngineError> {
        let row = sqlx::query(
            "SELECT id, species_variant_id, trait_id, sort_order, required, value_type, \
             default_value FROM trait_list_entries \
             WHERE species_variant_id = ? AND trait_id = ?",
        )
        .bind(variant_id.to_string())
        .bind(trait_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn list_entries(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, species_variant_id, trait_id, sort_order, required, value_type, \
             default_value FROM trait_list_entries \
             WHERE species_variant_id = ? ORDER BY sort_order, id",
        )
        .bind(variant_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn delete_entry(&self, id: TraitListEntryId) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT id, species_variant_id, trait_id, sort_order, required, value_type, \
             default_value FROM trait_list_entries WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        let entry = match row {
            Some(ref row) => entry_from_row(row)?,
            None => return Err(EngineError::EntryNotFound(id)),
        };

        sqlx::query(
            "DELETE FROM enum_value_settings WHERE species_variant_id = ? AND enum_value_id IN \
             (SELECT id FROM enum_values WHERE trait_id = ?)",
        )
        .bind(entry.species_variant_id.to_string())
        .bind(entry.trait_id.to_string())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM trait_list_entries WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_reorder(
        &self,
        variant_id: SpeciesVariantId,
        ordered_trait_ids: &[TraitId],
    ) -> Result<Vec<TraitListEntry>, EngineError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            "SELECT id, species_variant_id, trait_id, sort_order, required, value_type, \
             default_value FROM trait_list_entries WHERE species_variant_id = ?",
        )
        .bind(variant_id.to_string())
        .fetch_all(&mut *tx)
        .await?;
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let plan = plan_dense_reorder(variant_id, &entries, ordered_trait_ids)?;

        let mut by_id: BTreeMap<TraitListEntryId, TraitListEntry> =
            entries.into_iter().map(|e| (e.id, e)).collect();
        for (entry_id, order) in plan {
            sqlx::query("UPDATE trait_list_entries SET sort_order = ? WHERE id = ?")
                .bind(order)
                .bind(entry_id.to_string())
                .execute(&mut *tx)
                .await?;
            if let Some(entry) = by_id.get_mut(&entry_id) {
                entry.order = order;
            }
        }
        tx.commit().await?;

        let mut updated: Vec<TraitListEntry> = by_id.into_values().collect();
        updated.sort_by_key(|e| (e.order, e.id));
        Ok(updated)
    }

    async fn save_setting(&self, setting: &EnumValueSetting) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        ensure_trait_listed(&mut tx, setting.species_variant_id, setting.enum_value_id).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO enum_value_settings (enum_value_id, species_variant_id) \
             VALUES (?, ?)",
        )
        .bind(setting.enum_value_id.to_string())
        .bind(setting.species_variant_id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_setting(
        &self,
        variant_id: SpeciesVariantId,
        enum_value_id: EnumValueId,
    ) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        ensure_trait_listed(&mut tx, variant_id, enum_value_id).await?;
        sqlx::query(
            "DELETE FROM enum_value_settings WHERE enum_value_id = ? AND species_variant_id = ?",
        )
        .bind(enum_value_id.to_string())
        .bind(variant_id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_settings(
        &self,
        variant_id: SpeciesVariantId,
    ) -> Result<Vec<EnumValueSetting>, EngineError> {
        let rows = sqlx::query(
            "SELECT enum_value_id, species_variant_id FROM enum_value_settings \
             WHERE species_variant_id = ? ORDER BY enum_value_id",
        )
        .bind(variant_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(EnumValueSetting::new(
                    parse_id(row, "enum_value_id")?,
                    parse_id(row, "species_variant_id")?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl CharacterRepositoryPort for SqliteTraitStore {
    async fn create(&self, character: &Character) -> Result<(), EngineError> {
        sqlx::query("INSERT INTO characters (id, name, species_variant_id) VALUES (?, ?, ?)")
            .bind(character.id.to_string())
            .bind(&character.name)
            .bind(character.species_variant_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: CharacterId) -> Result<Option<Character>, EngineError> {
        let row = sqlx::query("SELECT id, name, species_variant_id FROM characters WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(character_from_row).transpose()
    }

    async fn get_values(
        &self,
        character_id: CharacterId,
    ) -> Result<BTreeMap<TraitId, Vec<TraitValue>>, EngineError> {
        let exists = sqlx::query("SELECT 1 FROM characters WHERE id = ?")
            .bind(character_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(EngineError::CharacterNotFound(character_id));
        }

        let rows = sqlx::query(
            "SELECT trait_id, value FROM character_trait_values \
             WHERE character_id = ? ORDER BY position",
        )
        .bind(character_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<TraitId, Vec<TraitValue>> = BTreeMap::new();
        for row in &rows {
            let trait_id: TraitId = parse_id(row, "trait_id")?;
            let raw: String = row.try_get("value")?;
            grouped
                .entry(trait_id)
                .or_default()
                .push(serde_json::from_str(&raw)?);
        }
        Ok(grouped)
    }

    async fn replace_values(
        &self,
        character_id: CharacterId,
        values: &[TraitValueRecord],
    ) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;
        replace_values_in_tx(&mut tx, character_id, values).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TraitReviewRepositoryPort for SqliteTraitStore {
    async fn create_pending(&self, review: &TraitReview) -> Result<(), EngineError> {
        let exists = sqlx::query("SELECT 1 FROM characters WHERE id = ?")
            .bind(review.subject_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(EngineError::CharacterNotFound(review.subject_id));
        }

        // the partial unique index turns a lost race into a conflict here
        let result = sqlx::query(
            "INSERT INTO trait_reviews \
             (id, subject_id, source, previous_values, proposed_values, status, created_at, \
              resolved_at, resolver_id, resolution_reason) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review.id.to_string())
        .bind(review.subject_id.to_string())
        .bind(review.source.as_str())
        .bind(serde_json::to_string(&review.previous_values)?)
        .bind(serde_json::to_string(&review.proposed_values)?)
        .bind(review.status.as_str())
        .bind(review.created_at)
        .bind(review.resolved_at)
        .bind(review.resolver_id.map(|id| id.to_string()))
        .bind(review.resolution_reason.as_deref())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            return Err(map_unique(err, || {
                EngineError::ReviewAlreadyPending(review.subject_id)
            }));
        }
        Ok(())
    }

    async fn get(&self, id: TraitReviewId) -> Result<Option<TraitReview>, EngineError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_REVIEW))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn approve(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
    ) -> Result<TraitReview, EngineError> {
        self.resolve_review(id, resolver_id, ReviewStatus::Approved, None)
            .await
    }

    async fn reject(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        self.resolve_review(id, resolver_id, ReviewStatus::Rejected, Some(reason))
            .await
    }

    async fn revert(
        &self,
        id: TraitReviewId,
        resolver_id: UserId,
        reason: &str,
    ) -> Result<TraitReview, EngineError> {
        self.resolve_review(id, resolver_id, ReviewStatus::Reverted, Some(reason))
            .await
    }

    async fn list_pending(
        &self,
        filter: &PendingReviewFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PendingReviewPage, EngineError> {
        let mut sql = format!("{} WHERE status = 'pending'", SELECT_REVIEW);
        if filter.subject_id.is_some() {
            sql.push_str(" AND subject_id = ?");
        }
        if filter.source.is_some() {
            sql.push_str(" AND source = ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(subject_id) = filter.subject_id {
            query = query.bind(subject_id.to_string());
        }
        if let Some(source) = filter.source {
            query = query.bind(source.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut pending = rows
            .iter()
            .map(review_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = pending.len();
        let reviews: Vec<TraitReview> = pending.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(reviews.len()) < total;
        Ok(PendingReviewPage {
            reviews,
            total,
            has_more,
        })
    }
}

/// The setting's trait must be on the variant's list
async fn ensure_trait_listed(
    tx: &mut Transaction<'_, Sqlite>,
    variant_id: SpeciesVariantId,
    enum_value_id: EnumValueId,
) -> Result<(), EngineError> {
    let row = sqlx::query("SELECT trait_id FROM enum_values WHERE id = ?")
        .bind(enum_value_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    let trait_id: TraitId = match row {
        Some(ref row) => parse_id(row, "trait_id")?,
        None => return Err(EngineError::EnumValueNotFound(enum_value_id)),
    };

    let listed = sqlx::query(
        "SELECT 1 FROM trait_list_entries WHERE species_variant_id = ? AND trait_id = ?",
    )
    .bind(variant_id.to_string())
    .bind(trait_id.to_string())
    .fetch_optional(&mut **tx)
    .await?;
    if listed.is_none() {
        return Err(EngineError::TraitNotInVariant {
            variant_id,
            trait_id,
        });
    }
    Ok(())
}

/// Validate and swap a character's value set within the caller's
/// transaction. Mutates nothing on error.
async fn replace_values_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    character_id: CharacterId,
    values: &[TraitValueRecord],
) -> Result<(), EngineError> {
    let exists = sqlx::query("SELECT 1 FROM characters WHERE id = ?")
        .bind(character_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
    if exists.is_none() {
        return Err(EngineError::CharacterNotFound(character_id));
    }

    let (definitions, enum_values) = load_validation_catalog(tx, values).await?;
    validate_value_set(&definitions, &enum_values, values)?;

    sqlx::query("DELETE FROM character_trait_values WHERE character_id = ?")
        .bind(character_id.to_string())
        .execute(&mut **tx)
        .await?;
    for (position, record) in values.iter().enumerate() {
        sqlx::query(
            "INSERT INTO character_trait_values \
             (character_id, position, trait_id, value, enum_value_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(character_id.to_string())
        .bind(position as i64)
        .bind(record.trait_id.to_string())
        .bind(serde_json::to_string(&record.value)?)
        .bind(record.value.as_enum_value().map(|id| id.to_string()))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Definitions and enum values referenced by the set, loaded by id so a
/// stale reference shows up as an absence, exactly as in the in-memory
/// tables.
async fn load_validation_catalog(
    tx: &mut Transaction<'_, Sqlite>,
    values: &[TraitValueRecord],
) -> Result<
    (
        BTreeMap<TraitId, TraitDefinition>,
        BTreeMap<EnumValueId, EnumValue>,
    ),
    EngineError,
> {
    let mut definitions = BTreeMap::new();
    let mut enum_values = BTreeMap::new();

    for record in values {
        if !definitions.contains_key(&record.trait_id) {
            let row = sqlx::query(
                "SELECT id, species_id, name, value_type, allows_multiple_values \
                 FROM trait_definitions WHERE id = ?",
            )
            .bind(record.trait_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
            if let Some(ref row) = row {
                definitions.insert(record.trait_id, trait_from_row(row)?);
            }
        }

        if let Some(enum_value_id) = record.value.as_enum_value() {
            if !enum_values.contains_key(&enum_value_id) {
                let row = sqlx::query(
                    "SELECT id, trait_id, name, sort_order, created_at \
                     FROM enum_values WHERE id = ?",
                )
                .bind(enum_value_id.to_string())
                .fetch_optional(&mut **tx)
                .await?;
                if let Some(ref row) = row {
                    enum_values.insert(enum_value_id, enum_value_from_row(row)?);
                }
            }
        }
    }

    Ok((definitions, enum_values))
}

// ===== Row mappers =====

fn parse_id<T>(row: &SqliteRow, column: &str) -> Result<T, EngineError>
where
    T: FromStr<Err = uuid::Error>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| EngineError::Storage(format!("Bad id in column {}: {}", column, e)))
}

fn species_from_row(row: &SqliteRow) -> Result<Species, EngineError> {
    Ok(Species {
        id: parse_id(row, "id")?,
        name: row.try_get("name")?,
    })
}

fn variant_from_row(row: &SqliteRow) -> Result<SpeciesVariant, EngineError> {
    Ok(SpeciesVariant {
        id: parse_id(row, "id")?,
        species_id: parse_id(row, "species_id")?,
        name: row.try_get("name")?,
    })
}

fn value_type_from_row(row: &SqliteRow) -> Result<TraitValueType, EngineError> {
    let raw: String = row.try_get("value_type")?;
    TraitValueType::parse(&raw)
        .ok_or_else(|| EngineError::Storage(format!("Unknown value type: {}", raw)))
}

fn trait_from_row(row: &SqliteRow) -> Result<TraitDefinition, EngineError> {
    Ok(TraitDefinition {
        id: parse_id(row, "id")?,
        species_id: parse_id(row, "species_id")?,
        name: row.try_get("name")?,
        value_type: value_type_from_row(row)?,
        allows_multiple_values: row.try_get("allows_multiple_values")?,
    })
}

fn enum_value_from_row(row: &SqliteRow) -> Result<EnumValue, EngineError> {
    Ok(EnumValue {
        id: parse_id(row, "id")?,
        trait_id: parse_id(row, "trait_id")?,
        name: row.try_get("name")?,
        order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<TraitListEntry, EngineError> {
    let default_raw: Option<String> = row.try_get("default_value")?;
    Ok(TraitListEntry {
        id: parse_id(row, "id")?,
        species_variant_id: parse_id(row, "species_variant_id")?,
        trait_id: parse_id(row, "trait_id")?,
        order: row.try_get("sort_order")?,
        required: row.try_get("required")?,
        value_type: value_type_from_row(row)?,
        default_value: default_raw.as_deref().map(serde_json::from_str).transpose()?,
    })
}

fn character_from_row(row: &SqliteRow) -> Result<Character, EngineError> {
    Ok(Character {
        id: parse_id(row, "id")?,
        name: row.try_get("name")?,
        species_variant_id: parse_id(row, "species_variant_id")?,
    })
}

fn review_from_row(row: &SqliteRow) -> Result<TraitReview, EngineError> {
    let source_raw: String = row.try_get("source")?;
    let status_raw: String = row.try_get("status")?;
    let previous_raw: String = row.try_get("previous_values")?;
    let proposed_raw: String = row.try_get("proposed_values")?;
    let resolver_raw: Option<String> = row.try_get("resolver_id")?;

    Ok(TraitReview {
        id: parse_id(row, "id")?,
        subject_id: parse_id(row, "subject_id")?,
        source: ReviewSource::parse(&source_raw)
            .ok_or_else(|| EngineError::Storage(format!("Unknown review source: {}", source_raw)))?,
        previous_values: serde_json::from_str(&previous_raw)?,
        proposed_values: serde_json::from_str(&proposed_raw)?,
        status: ReviewStatus::parse(&status_raw)
            .ok_or_else(|| EngineError::Storage(format!("Unknown review status: {}", status_raw)))?,
        created_at: row.try_get("created_at")?,
        resolved_at: row.try_get("resolved_at")?,
        resolver_id: resolver_raw
            .map(|raw| {
                raw.parse::<UserId>().map_err(|e| {
                    EngineError::Storage(format!("Bad id in column resolver_id: {}", e))
                })
            })
            .transpose()?,
        resolution_reason: row.try_get("resolution_reason")?,
    })
}
