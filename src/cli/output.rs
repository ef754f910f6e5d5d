use serde::Serialize;

use crate::model::{Category, Task, TaskStats};
use crate::store::CategoryStore;

/// Label shown when a task has no category or references a deleted one
pub const UNCATEGORIZED: &str = "uncategorized";

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct TaskListJson {
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryJson {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct CategoryListJson {
    pub categories: Vec<CategoryJson>,
}

#[derive(Serialize)]
pub struct PaletteJson {
    pub values: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Resolve the display label for a task's category. A dangling reference
/// (category deleted) renders as "uncategorized", same as no reference.
pub fn category_label(task: &Task, categories: &CategoryStore) -> Option<String> {
    let id = task.category_id.as_deref()?;
    Some(
        categories
            .by_id(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
    )
}

pub fn task_to_json(task: &Task, categories: &CategoryStore) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        priority: task.priority.map(|p| p.as_str().to_string()),
        due_date: task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        category_id: task.category_id.clone(),
        category: category_label(task, categories),
        created_at: task.created_at.to_rfc3339(),
        updated_at: task.updated_at.to_rfc3339(),
    }
}

pub fn category_to_json(category: &Category) -> CategoryJson {
    CategoryJson {
        id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
        icon: category.icon.clone(),
        created_at: category.created_at.to_rfc3339(),
        updated_at: category.updated_at.to_rfc3339(),
    }
}

// ---------------------------------------------------------------------------
// Plain text printers
// ---------------------------------------------------------------------------

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap());
}

/// One task per line: `[x] task_1f87a3 Buy milk !high @Personal due 2026-09-01`
pub fn print_task_line(task: &Task, categories: &CategoryStore) {
    let check = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{}] {} {}", check, short_id(&task.id), task.title);
    if let Some(priority) = task.priority {
        line.push_str(&format!(" !{}", priority.as_str()));
    }
    if let Some(label) = category_label(task, categories) {
        line.push_str(&format!(" @{}", label));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d")));
    }
    println!("{}", line);
}

pub fn print_task_detail(task: &Task, categories: &CategoryStore) {
    println!("id:        {}", task.id);
    println!("title:     {}", task.title);
    if let Some(desc) = &task.description {
        println!("desc:      {}", desc);
    }
    println!("completed: {}", task.completed);
    if let Some(priority) = task.priority {
        println!("priority:  {}", priority.as_str());
    }
    if let Some(due) = task.due_date {
        println!("due:       {}", due.format("%Y-%m-%d"));
    }
    if let Some(label) = category_label(task, categories) {
        println!("category:  {}", label);
    }
    println!("created:   {}", task.created_at.to_rfc3339());
    println!("updated:   {}", task.updated_at.to_rfc3339());
}

pub fn print_category_line(category: &Category) {
    let icon = category.icon.as_deref().unwrap_or("-");
    println!(
        "{} {} {} {}",
        short_id(&category.id),
        category.name,
        category.color,
        icon
    );
}

pub fn print_stats(stats: &TaskStats) {
    println!(
        "{} total, {} completed, {} pending",
        stats.total, stats.completed, stats.pending
    );
}

/// First 12 characters of an id, enough to disambiguate in practice.
/// Full ids are still accepted everywhere and shown by `show`.
fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
