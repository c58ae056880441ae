//! Model catalog: chronic complications, their stages, and acute event kinds
//!
//! The catalog is built once during model setup and shared read-only by
//! every session (usually behind an `Arc`). Identifiers are dense indices in
//! registration order, which doubles as the deterministic iteration and
//! tie-break rank.
//!
//! # Example
//!
//! ```rust
//! use cohort_sim_core::models::catalog::ModelCatalog;
//!
//! let mut catalog = ModelCatalog::new();
//! let nep = catalog.add_category("NEP").unwrap();
//! let alb1 = catalog.add_stage(nep, "ALB1").unwrap();
//! let esrd = catalog.add_stage(nep, "ESRD").unwrap();
//! let hypo = catalog.add_acute("SHE").unwrap();
//!
//! assert!(alb1 < esrd);
//! assert_eq!(catalog.stage(esrd).unwrap().category(), nep);
//! assert_eq!(catalog.acute(hypo).unwrap().name(), "SHE");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Index of a chronic complication category
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CategoryId(pub usize);

/// Catalog-wide rank of a complication stage
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StageId(pub usize);

/// Index of an acute event kind
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AcuteId(pub usize);

/// Errors raised while building a catalog
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Duplicate name in catalog: {0}")]
    DuplicateName(String),

    #[error("Unknown complication category: {0:?}")]
    UnknownCategory(CategoryId),

    #[error("Unknown complication stage: {0:?}")]
    UnknownStage(StageId),

    #[error("Unknown name in catalog: {0}")]
    UnknownName(String),

    #[error("Category {0} has no stages")]
    EmptyCategory(String),
}

/// A chronic complication grouping, e.g. nephropathy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronicCategory {
    id: CategoryId,
    name: String,
    stages: Vec<StageId>,
}

impl ChronicCategory {
    pub fn id(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages in severity order
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }
}

/// A severity level inside one chronic category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplicationStage {
    id: StageId,
    name: String,
    category: CategoryId,
}

impl ComplicationStage {
    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }
}

/// A recurring, memoryless adverse event kind, e.g. severe hypoglycemia
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcuteKind {
    id: AcuteId,
    name: String,
}

impl AcuteKind {
    pub fn id(&self) -> AcuteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of every category, stage and acute kind in one model
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    categories: Vec<ChronicCategory>,
    stages: Vec<ComplicationStage>,
    acute: Vec<AcuteKind>,
    names: HashMap<String, NamedEntry>,
}

#[derive(Debug, Clone, Copy)]
enum NamedEntry {
    Category(CategoryId),
    Stage(StageId),
    Acute(AcuteId),
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chronic complication category
    pub fn add_category(&mut self, name: &str) -> Result<CategoryId, CatalogError> {
        let id = CategoryId(self.categories.len());
        self.claim_name(name, NamedEntry::Category(id))?;
        self.categories.push(ChronicCategory {
            id,
            name: name.to_string(),
            stages: Vec::new(),
        });
        Ok(id)
    }

    /// Register the next (more severe) stage of `category`
    pub fn add_stage(&mut self, category: CategoryId, name: &str) -> Result<StageId, CatalogError> {
        if category.0 >= self.categories.len() {
            return Err(CatalogError::UnknownCategory(category));
        }
        let id = StageId(self.stages.len());
        self.claim_name(name, NamedEntry::Stage(id))?;
        self.stages.push(ComplicationStage {
            id,
            name: name.to_string(),
            category,
        });
        self.categories[category.0].stages.push(id);
        Ok(id)
    }

    /// Register an acute event kind
    pub fn add_acute(&mut self, name: &str) -> Result<AcuteId, CatalogError> {
        let id = AcuteId(self.acute.len());
        self.claim_name(name, NamedEntry::Acute(id))?;
        self.acute.push(AcuteKind {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    fn claim_name(&mut self, name: &str, entry: NamedEntry) -> Result<(), CatalogError> {
        if self.names.contains_key(name) {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        self.names.insert(name.to_string(), entry);
        Ok(())
    }

    /// Check that every category has at least one stage
    pub fn validate(&self) -> Result<(), CatalogError> {
        match self.categories.iter().find(|c| c.stages.is_empty()) {
            Some(empty) => Err(CatalogError::EmptyCategory(empty.name.clone())),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn category(&self, id: CategoryId) -> Option<&ChronicCategory> {
        self.categories.get(id.0)
    }

    pub fn stage(&self, id: StageId) -> Option<&ComplicationStage> {
        self.stages.get(id.0)
    }

    pub fn acute(&self, id: AcuteId) -> Option<&AcuteKind> {
        self.acute.get(id.0)
    }

    /// Category a stage belongs to
    pub fn category_of(&self, stage: StageId) -> Result<CategoryId, CatalogError> {
        self.stage(stage)
            .map(|s| s.category)
            .ok_or(CatalogError::UnknownStage(stage))
    }

    pub fn stage_by_name(&self, name: &str) -> Result<StageId, CatalogError> {
        match self.names.get(name) {
            Some(NamedEntry::Stage(id)) => Ok(*id),
            _ => Err(CatalogError::UnknownName(name.to_string())),
        }
    }

    pub fn category_by_name(&self, name: &str) -> Result<CategoryId, CatalogError> {
        match self.names.get(name) {
            Some(NamedEntry::Category(id)) => Ok(*id),
            _ => Err(CatalogError::UnknownName(name.to_string())),
        }
    }

    pub fn acute_by_name(&self, name: &str) -> Result<AcuteId, CatalogError> {
        match self.names.get(name) {
            Some(NamedEntry::Acute(id)) => Ok(*id),
            _ => Err(CatalogError::UnknownName(name.to_string())),
        }
    }

    /// All category ids in registration order
    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.categories.iter().map(|c| c.id)
    }

    /// All acute kind ids in registration order
    pub fn acute_ids(&self) -> impl Iterator<Item = AcuteId> + '_ {
        self.acute.iter().map(|a| a.id)
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_acute(&self) -> usize {
        self.acute.len()
    }
}
