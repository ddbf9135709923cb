//! Catalog of domain facts the reconciler validates rule rows against.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use planetmans_core::ScrimActionType;

use crate::defaults;
use crate::error::{Result, RulesetError};

/// A weapon item and the category that owns it, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponItem {
    pub id: i32,
    #[serde(default)]
    pub item_category_id: Option<i32>,
}

/// Read-only source of valid action types, item categories and weapon items.
#[async_trait]
pub trait RuleCatalogSource: Send + Sync {
    async fn list_valid_action_types(&self) -> Result<Vec<ScrimActionType>>;

    async fn list_item_category_ids(&self) -> Result<Vec<i32>>;

    async fn list_weapon_item_category_ids(&self) -> Result<Vec<i32>>;

    async fn list_weapon_items(&self) -> Result<Vec<WeaponItem>>;
}

/// Point-in-time copy of every catalog enumeration, taken once per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub valid_action_types: Vec<ScrimActionType>,
    #[serde(default)]
    pub item_category_ids: Vec<i32>,
    #[serde(default)]
    pub weapon_item_category_ids: Vec<i32>,
    #[serde(default)]
    pub weapon_items: Vec<WeaponItem>,
}

impl CatalogSnapshot {
    pub async fn fetch(source: &dyn RuleCatalogSource) -> Result<Self> {
        let (valid_action_types, item_category_ids, weapon_item_category_ids, weapon_items) = tokio::try_join!(
            source.list_valid_action_types(),
            source.list_item_category_ids(),
            source.list_weapon_item_category_ids(),
            source.list_weapon_items(),
        )?;
        Ok(Self {
            valid_action_types,
            item_category_ids,
            weapon_item_category_ids,
            weapon_items,
        })
    }
}

/// Catalog held entirely in memory, loadable from YAML.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    snapshot: CatalogSnapshot,
}

impl StaticCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Catalog derived from the action enum and the built-in defaults: every
    /// action type is valid, every default category is a weapon category and
    /// every default item is a weapon item.
    pub fn builtin() -> Self {
        let categories: Vec<i32> = defaults::default_item_category_rules()
            .iter()
            .map(|r| r.item_category_id)
            .collect();
        let weapon_items = defaults::default_item_rules()
            .iter()
            .map(|r| WeaponItem {
                id: r.item_id,
                item_category_id: Some(r.item_category_id),
            })
            .collect();
        Self::new(CatalogSnapshot {
            valid_action_types: ScrimActionType::ALL.to_vec(),
            item_category_ids: categories.clone(),
            weapon_item_category_ids: categories,
            weapon_items,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_yaml::from_str(yaml)?;
        if snapshot.item_category_ids.is_empty() && snapshot.valid_action_types.is_empty() {
            return Err(RulesetError::Catalog(
                "catalog lists neither action types nor item categories".to_string(),
            ));
        }
        Ok(Self::new(snapshot))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&contents)?;
        info!(
            path = %path.display(),
            action_types = catalog.snapshot.valid_action_types.len(),
            categories = catalog.snapshot.item_category_ids.len(),
            weapon_items = catalog.snapshot.weapon_items.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl RuleCatalogSource for StaticCatalog {
    async fn list_valid_action_types(&self) -> Result<Vec<ScrimActionType>> {
        Ok(self.snapshot.valid_action_types.clone())
    }

    async fn list_item_category_ids(&self) -> Result<Vec<i32>> {
        Ok(self.snapshot.item_category_ids.clone())
    }

    async fn list_weapon_item_category_ids(&self) -> Result<Vec<i32>> {
        Ok(self.snapshot.weapon_item_category_ids.clone())
    }

    async fn list_weapon_items(&self) -> Result<Vec<WeaponItem>> {
        Ok(self.snapshot.weapon_items.clone())
    }
}
