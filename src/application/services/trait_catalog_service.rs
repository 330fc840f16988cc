//! Trait Catalog Service - Application service for species trait catalogs
//!
//! This service provides use case implementations for defining species,
//! variants, typed traits, and the enum options selectable for enum traits.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::ports::outbound::TraitCatalogRepositoryPort;
use crate::domain::entities::{EnumValue, Species, SpeciesVariant, TraitDefinition};
use crate::domain::errors::EngineError;
use crate::domain::value_objects::{
    EnumValueId, SpeciesId, SpeciesVariantId, TraitId, TraitValueType,
};

/// Request to define a new trait for a species
#[derive(Debug, Clone)]
pub struct DefineTraitRequest {
    pub species_id: SpeciesId,
    pub name: String,
    pub value_type: TraitValueType,
    pub allows_multiple_values: bool,
}

/// Service for managing the species-level trait catalog
pub struct TraitCatalogService {
    catalog: Arc<dyn TraitCatalogRepositoryPort>,
}

impl TraitCatalogService {
    pub fn new(catalog: Arc<dyn TraitCatalogRepositoryPort>) -> Self {
        Self { catalog }
    }

    /// Validate a display name for catalog records
    fn validate_name(name: &str) -> Result<(), EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidName("name cannot be empty".to_string()));
        }
        if name.len() > 255 {
            return Err(EngineError::InvalidName(
                "name cannot exceed 255 characters".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(name = %name))]
    pub async fn create_species(&self, name: &str) -> Result<Species, EngineError> {
        Self::validate_name(name)?;

        let species = Species::new(name);
        self.catalog.create_species(&species).await?;

        info!(species_id = %species.id, "Created species: {}", species.name);
        Ok(species)
    }

    #[instrument(skip(self), fields(species_id = %species_id, name = %name))]
    pub async fn create_variant(
        &self,
        species_id: SpeciesId,
        name: &str,
    ) -> Result<SpeciesVariant, EngineError> {
        Self::validate_name(name)?;

        // Verify the species exists
        self.catalog
            .get_species(species_id)
            .await?
            .ok_or(EngineError::SpeciesNotFound(species_id))?;

        let variant = SpeciesVariant::new(species_id, name);
        self.catalog.create_variant(&variant).await?;

        info!(variant_id = %variant.id, "Created variant: {}", variant.name);
        Ok(variant)
    }

    #[instrument(skip(self), fields(species_id = %request.species_id, name = %request.name))]
    pub async fn define_trait(
        &self,
        request: DefineTraitRequest,
    ) -> Result<TraitDefinition, EngineError> {
        Self::validate_name(&request.name)?;

        self.catalog
            .get_species(request.species_id)
            .await?
            .ok_or(EngineError::SpeciesNotFound(request.species_id))?;

        let mut definition =
            TraitDefinition::new(request.species_id, &request.name, request.value_type);
        if request.allows_multiple_values {
            definition = definition.with_multiple_values();
        }

        self.catalog.create_trait(&definition).await?;

        info!(
            trait_id = %definition.id,
            value_type = %definition.value_type,
            multiple = definition.allows_multiple_values,
            "Defined trait: {}",
            definition.name
        );
        Ok(definition)
    }

    #[instrument(skip(self))]
    pub async fn get_species(&self, id: SpeciesId) -> Result<Species, EngineError> {
        self.catalog
            .get_species(id)
            .await?
            .ok_or(EngineError::SpeciesNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn get_variant(&self, id: SpeciesVariantId) -> Result<SpeciesVariant, EngineError> {
        self.catalog
            .get_variant(id)
            .await?
            .ok_or(EngineError::VariantNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn get_trait(&self, id: TraitId) -> Result<TraitDefinition, EngineError> {
        self.catalog
            .get_trait(id)
            .await?
            .ok_or(EngineError::TraitNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn list_traits(
        &self,
        species_id: SpeciesId,
    ) -> Result<Vec<TraitDefinition>, EngineError> {
        debug!(species_id = %species_id, "Listing traits for species");

        self.catalog
            .get_species(species_id)
            .await?
            .ok_or(EngineError::SpeciesNotFound(species_id))?;

        self.catalog.list_traits(species_id).await
    }

    /// Add a selectable option to an enum-typed trait. The order is a
    /// plain sort key; fractional values insert between existing options.
    #[instrument(skip(self), fields(trait_id = %trait_id, name = %name, order = order))]
    pub async fn add_enum_value(
        &self,
        trait_id: TraitId,
        name: &str,
        order: f64,
    ) -> Result<EnumValue, EngineError> {
        Self::validate_name(name)?;

        let definition = self
            .catalog
            .get_trait(trait_id)
            .await?
            .ok_or(EngineError::TraitNotFound(trait_id))?;
        if definition.value_type != TraitValueType::Enum {
            return Err(EngineError::InvalidTraitType(trait_id));
        }

        let value = EnumValue::new(trait_id, name, order);
        self.catalog.create_enum_value(&value).await?;

        info!(enum_value_id = %value.id, "Added enum value: {}", value.name);
        Ok(value)
    }

    /// Move an enum value to a new sort position
    #[instrument(skip(self), fields(enum_value_id = %id, order = order))]
    pub async fn reorder_enum_value(
        &self,
        id: EnumValueId,
        order: f64,
    ) -> Result<EnumValue, EngineError> {
        let value = self.catalog.update_enum_value_order(id, order).await?;

        debug!(enum_value_id = %id, "Moved enum value to order {}", order);
        Ok(value)
    }

    /// Delete an enum value. Variant settings and stored character values
    /// referencing it are removed in the same step; trait list entry
    /// defaults that reference it are left in place.
    #[instrument(skip(self))]
    pub async fn delete_enum_value(&self, id: EnumValueId) -> Result<(), EngineError> {
        self.catalog.delete_enum_value(id).await?;

        info!(enum_value_id = %id, "Deleted enum value");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_enum_values(&self, trait_id: TraitId) -> Result<Vec<EnumValue>, EngineError> {
        debug!(trait_id = %trait_id, "Listing enum values for trait");

        self.catalog
            .get_trait(trait_id)
            .await?
            .ok_or(EngineError::TraitNotFound(trait_id))?;

        self.catalog.list_enum_values(trait_id).await
    }
}
