pub mod categories;
pub mod tasks;

pub use categories::CategoryStore;
pub use tasks::TaskStore;

use uuid::Uuid;

/// Generate a unique entity id like `task_1f87a3…` or `cat_9c04b2…`.
/// Ids are assigned once at creation and never reassigned.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
