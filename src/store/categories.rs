use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::model::category::{
    AVAILABLE_COLORS, AVAILABLE_ICONS, Category, CategoryPatch, DEFAULT_CATEGORIES, NewCategory,
};
use crate::storage::{self, KeyValueStore, StorageError};

use super::generate_id;

/// Persistence key for the category collection
pub const CATEGORIES_KEY: &str = "categories-store";

/// The authoritative in-memory list of categories, including first-run
/// seeding. Same persistence contract as `TaskStore`: mutate memory,
/// persist the whole collection, surface only write failures.
pub struct CategoryStore {
    storage: Arc<dyn KeyValueStore>,
    categories: Vec<Category>,
    loading: bool,
}

impl CategoryStore {
    /// Create an empty store. Call `load()` to hydrate from storage.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        CategoryStore {
            storage,
            categories: Vec::new(),
            loading: false,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence round-trip
    // -----------------------------------------------------------------------

    /// Hydrate from storage. When the stored collection is absent, empty,
    /// or unreadable, seed the default categories and persist the seed.
    pub async fn load(&mut self) {
        self.loading = true;
        let stored = match storage::get_json::<Vec<Category>>(self.storage.as_ref(), CATEGORIES_KEY)
            .await
        {
            Ok(Some(categories)) if !categories.is_empty() => Some(categories),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "could not load categories, seeding defaults");
                None
            }
        };
        match stored {
            Some(categories) => self.categories = categories,
            None => {
                self.seed_defaults();
                if let Err(e) = self.save().await {
                    warn!(error = %e, "could not persist seeded default categories");
                }
            }
        }
        self.loading = false;
    }

    fn seed_defaults(&mut self) {
        let now = Utc::now();
        self.categories = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, color, icon)| Category {
                id: generate_id("cat"),
                name: (*name).to_string(),
                color: (*color).to_string(),
                icon: Some((*icon).to_string()),
                created_at: now,
                updated_at: now,
            })
            .collect();
    }

    async fn save(&self) -> Result<(), StorageError> {
        storage::set_json(self.storage.as_ref(), CATEGORIES_KEY, &self.categories).await
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new category and persist. Returns the created category.
    pub async fn add(&mut self, data: NewCategory) -> Result<Category, StorageError> {
        let now = Utc::now();
        let category = Category {
            id: generate_id("cat"),
            name: data.name,
            color: data.color,
            icon: data.icon,
            created_at: now,
            updated_at: now,
        };
        self.categories.push(category.clone());
        self.save().await?;
        Ok(category)
    }

    /// Merge `patch` into the category with `id`, refresh `updated_at`,
    /// persist. Returns `None` without persisting when the id is absent.
    pub async fn update(
        &mut self,
        id: &str,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, StorageError> {
        let Some(category) = self.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        patch.apply(category);
        // wall clock may step backwards; keep updated_at monotonic
        category.updated_at = Utc::now().max(category.updated_at);
        let updated = category.clone();
        self.save().await?;
        Ok(Some(updated))
    }

    /// Remove the category with `id`. Persists only when a removal
    /// occurred. Tasks referencing the id are not touched; their
    /// `category_id` is left dangling and renders as "uncategorized".
    pub async fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        if self.categories.len() < before {
            self.save().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // -----------------------------------------------------------------------
    // Read views
    // -----------------------------------------------------------------------

    /// The collection in insertion order.
    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by name. Full Unicode folding, so accented
    /// names like the seeded Spanish ones match regardless of case.
    pub fn by_name(&self, name: &str) -> Option<&Category> {
        let folded = name.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name.to_lowercase() == folded)
    }

    /// Whether any category other than `exclude_id` has this name
    /// (case-insensitive).
    pub fn exists(&self, name: &str, exclude_id: Option<&str>) -> bool {
        let folded = name.to_lowercase();
        self.categories
            .iter()
            .any(|c| c.name.to_lowercase() == folded && Some(c.id.as_str()) != exclude_id)
    }

    pub fn available_colors(&self) -> &'static [&'static str] {
        &AVAILABLE_COLORS
    }

    pub fn available_icons(&self) -> &'static [&'static str] {
        &AVAILABLE_ICONS
    }

    /// Whether a `load()` is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
