use clap::{Args, Parser, Subcommand};

use crate::model::{Priority, SortCriteria};

#[derive(Parser)]
#[command(name = "listo", about = concat!("listo v", env!("CARGO_PKG_VERSION"), " - your to-do list, kept local"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    Add(AddArgs),
    /// List tasks
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Toggle a task between done and pending
    Done(DoneArgs),
    /// Edit a task
    Edit(EditArgs),
    /// Delete a task
    Rm(RmArgs),
    /// Delete all completed tasks
    ClearDone,
    /// Show task statistics
    Stats,
    /// Manage categories
    Cat(CatCmd),
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Longer description
    #[arg(long)]
    pub desc: Option<String>,
    /// Priority (low|medium|high)
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Category name or id
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only completed tasks
    #[arg(long, conflicts_with = "pending")]
    pub completed: bool,
    /// Only pending tasks
    #[arg(long)]
    pub pending: bool,
    /// Only tasks with this priority
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Case-insensitive substring match on title or description
    #[arg(long)]
    pub search: Option<String>,
    /// Only tasks in this category (name or id)
    #[arg(long)]
    pub category: Option<String>,
    /// Sort order (date|priority|name)
    #[arg(long)]
    pub sort: Option<SortCriteria>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task id
    pub id: String,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Task id
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(long, conflicts_with = "no_desc")]
    pub desc: Option<String>,
    /// Clear the description
    #[arg(long)]
    pub no_desc: bool,
    /// New priority (low|medium|high)
    #[arg(long, conflicts_with = "no_priority")]
    pub priority: Option<Priority>,
    /// Clear the priority
    #[arg(long)]
    pub no_priority: bool,
    /// New due date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "no_due")]
    pub due: Option<String>,
    /// Clear the due date
    #[arg(long)]
    pub no_due: bool,
    /// New category (name or id)
    #[arg(long, conflicts_with = "no_category")]
    pub category: Option<String>,
    /// Clear the category
    #[arg(long)]
    pub no_category: bool,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task id
    pub id: String,
}

#[derive(Args)]
pub struct CatCmd {
    #[command(subcommand)]
    pub command: CatCommands,
}

#[derive(Subcommand)]
pub enum CatCommands {
    /// List categories
    List,
    /// Add a category
    Add(CatAddArgs),
    /// Edit a category
    Edit(CatEditArgs),
    /// Delete a category (tasks keep their reference)
    Rm(CatRmArgs),
    /// Show the color palette
    Colors,
    /// Show the icon set
    Icons,
}

#[derive(Args)]
pub struct CatAddArgs {
    /// Category name (unique, case-insensitive)
    pub name: String,
    /// Hex color from the palette (see `listo cat colors`)
    #[arg(long)]
    pub color: Option<String>,
    /// Icon from the icon set (see `listo cat icons`)
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Args)]
pub struct CatEditArgs {
    /// Category name or id
    pub category: String,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// New color
    #[arg(long)]
    pub color: Option<String>,
    /// New icon
    #[arg(long, conflicts_with = "no_icon")]
    pub icon: Option<String>,
    /// Clear the icon
    #[arg(long)]
    pub no_icon: bool,
}

#[derive(Args)]
pub struct CatRmArgs {
    /// Category name or id
    pub category: String,
}
