use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    /// Case-insensitively unique among categories. Uniqueness is enforced
    /// at the CLI boundary, not here.
    pub name: String,
    /// Hex color, one of `AVAILABLE_COLORS`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a category
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
}

/// Partial update for a category. `None` leaves the stored field untouched;
/// `icon: Some(None)` clears the icon.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
}

impl CategoryPatch {
    pub fn apply(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(color) = &self.color {
            category.color = color.clone();
        }
        if let Some(icon) = &self.icon {
            category.icon = icon.clone();
        }
    }
}

/// The fixed color palette offered for categories
pub const AVAILABLE_COLORS: [&str; 12] = [
    "#6366f1", // indigo
    "#06b6d4", // cyan
    "#ec4899", // pink
    "#10b981", // emerald
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // violet
    "#f97316", // orange
    "#14b8a6", // teal
    "#3b82f6", // blue
    "#84cc16", // lime
    "#64748b", // slate
];

/// The fixed icon set offered for categories
pub const AVAILABLE_ICONS: [&str; 20] = [
    "person-outline",
    "briefcase-outline",
    "cart-outline",
    "home-outline",
    "heart-outline",
    "star-outline",
    "bookmark-outline",
    "flag-outline",
    "folder-outline",
    "document-outline",
    "calendar-outline",
    "time-outline",
    "fitness-outline",
    "restaurant-outline",
    "car-outline",
    "airplane-outline",
    "school-outline",
    "medkit-outline",
    "cash-outline",
    "gift-outline",
];

/// Categories seeded on first run: (name, color, icon)
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 4] = [
    ("Personal", "#3880ff", "person-outline"),
    ("Trabajo", "#eb445a", "briefcase-outline"),
    ("Compras", "#2dd36f", "cart-outline"),
    ("Hogar", "#ffc409", "home-outline"),
];
