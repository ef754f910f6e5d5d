use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::error;

use crate::cli::commands::*;
use crate::cli::output::{self, CategoryListJson, PaletteJson, TaskListJson};
use crate::config;
use crate::flags::{FileSource, FlagGate};
use crate::model::{
    AVAILABLE_COLORS, AVAILABLE_ICONS, CategoryPatch, NewCategory, NewTask, TaskFilter, TaskPatch,
};
use crate::storage::{JsonFileStore, StorageError};
use crate::store::{CategoryStore, TaskStore};

type CliError = Box<dyn std::error::Error>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref());
    let app_config = config::load_config(&data_dir)?;
    let storage = Arc::new(JsonFileStore::open(&data_dir)?);

    let mut tasks = TaskStore::new(storage.clone());
    let mut categories = CategoryStore::new(storage);
    tasks.load().await;
    categories.load().await;

    let mut gate = if app_config.flags.enabled {
        FlagGate::new(
            Box::new(FileSource::new(&data_dir.join("flags.toml"))),
            Duration::from_secs(app_config.flags.min_fetch_interval_secs),
        )
    } else {
        FlagGate::defaults()
    };
    gate.refresh().await;

    let json = cli.json;
    match cli.command {
        Commands::Add(args) => cmd_add(args, &mut tasks, &categories, &gate, json).await,
        Commands::List(args) => cmd_list(args, &mut tasks, &categories, json),
        Commands::Show(args) => cmd_show(args, &tasks, &categories, json),
        Commands::Done(args) => cmd_done(args, &mut tasks, json).await,
        Commands::Edit(args) => cmd_edit(args, &mut tasks, &categories, &gate, json).await,
        Commands::Rm(args) => cmd_rm(args, &mut tasks).await,
        Commands::ClearDone => cmd_clear_done(&mut tasks).await,
        Commands::Stats => cmd_stats(&tasks, &gate, json),
        Commands::Cat(cmd) => cmd_cat(cmd.command, &mut categories, &gate, json).await,
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Write failures surface as a generic notice; the detail goes to the log.
fn save_failed(e: StorageError) -> CliError {
    error!(error = %e, "persistence write failed");
    "could not save changes, your last change may not be persisted".into()
}

fn parse_due(s: &str) -> Result<DateTime<Utc>, CliError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid due date '{}' (expected YYYY-MM-DD)", s))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Resolve user input to a full task id, accepting unique id prefixes.
fn resolve_task_id(tasks: &TaskStore, input: &str) -> Result<String, CliError> {
    if tasks.task_by_id(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&str> = tasks
        .all()
        .iter()
        .filter(|t| t.id.starts_with(input))
        .map(|t| t.id.as_str())
        .collect();
    match matches.as_slice() {
        [] => Err(format!("task not found: {}", input).into()),
        [id] => Ok((*id).to_string()),
        _ => Err(format!("ambiguous task id: {}", input).into()),
    }
}

/// Resolve a category argument (name or id) to its id.
fn resolve_category_id(categories: &CategoryStore, input: &str) -> Result<String, CliError> {
    if let Some(cat) = categories.by_id(input) {
        return Ok(cat.id.clone());
    }
    if let Some(cat) = categories.by_name(input) {
        return Ok(cat.id.clone());
    }
    Err(format!("no category named or with id '{}'", input).into())
}

fn require_categories(gate: &FlagGate) -> Result<(), CliError> {
    if gate.categories_enabled() {
        Ok(())
    } else {
        Err("categories are disabled".into())
    }
}

fn validate_color(color: &str) -> Result<String, CliError> {
    AVAILABLE_COLORS
        .iter()
        .find(|c| c.eq_ignore_ascii_case(color))
        .map(|c| (*c).to_string())
        .ok_or_else(|| format!("unknown color '{}' (see `listo cat colors`)", color).into())
}

fn validate_icon(icon: &str) -> Result<String, CliError> {
    AVAILABLE_ICONS
        .iter()
        .find(|i| i.eq_ignore_ascii_case(icon))
        .map(|i| (*i).to_string())
        .ok_or_else(|| format!("unknown icon '{}' (see `listo cat icons`)", icon).into())
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

async fn cmd_add(
    args: AddArgs,
    tasks: &mut TaskStore,
    categories: &CategoryStore,
    gate: &FlagGate,
    json: bool,
) -> Result<(), CliError> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err("title cannot be empty".into());
    }

    let category_id = match &args.category {
        Some(input) => {
            require_categories(gate)?;
            Some(resolve_category_id(categories, input)?)
        }
        None => None,
    };
    let due_date = args.due.as_deref().map(parse_due).transpose()?;

    let task = tasks
        .add(NewTask {
            title: title.to_string(),
            description: args.desc,
            completed: false,
            priority: args.priority,
            due_date,
            category_id,
        })
        .await
        .map_err(save_failed)?;

    if json {
        output::print_json(&output::task_to_json(&task, categories));
    } else {
        println!("added {} ({})", task.id, task.title);
    }
    Ok(())
}

fn cmd_list(
    args: ListArgs,
    tasks: &mut TaskStore,
    categories: &CategoryStore,
    json: bool,
) -> Result<(), CliError> {
    let mut filter = TaskFilter::default();
    if args.completed {
        filter.completed = Some(true);
    }
    if args.pending {
        filter.completed = Some(false);
    }
    filter.priority = args.priority;
    filter.search_term = args.search;
    tasks.set_filter(filter);

    // A deleted category's id still selects the tasks that reference it,
    // so id-shaped input passes through unresolved. Unresolvable names
    // are typos and error out.
    let category_id = match args.category {
        Some(input) => match resolve_category_id(categories, &input) {
            Ok(id) => Some(id),
            Err(_) if input.starts_with("cat_") => Some(input),
            Err(e) => return Err(e),
        },
        None => None,
    };

    let mut list: Vec<_> = match args.sort {
        Some(criteria) => tasks.sorted_tasks(criteria),
        None => tasks.filtered_tasks().into_iter().cloned().collect(),
    };
    if let Some(id) = &category_id {
        list.retain(|t| t.category_id.as_deref() == Some(id.as_str()));
    }

    if json {
        let tasks_json = list
            .iter()
            .map(|t| output::task_to_json(t, categories))
            .collect();
        output::print_json(&TaskListJson { tasks: tasks_json });
    } else if list.is_empty() {
        println!("no tasks");
    } else {
        for task in &list {
            output::print_task_line(task, categories);
        }
    }
    Ok(())
}

fn cmd_show(
    args: ShowArgs,
    tasks: &TaskStore,
    categories: &CategoryStore,
    json: bool,
) -> Result<(), CliError> {
    let id = resolve_task_id(tasks, &args.id)?;
    let Some(task) = tasks.task_by_id(&id) else {
        return Err(format!("task not found: {}", args.id).into());
    };
    if json {
        output::print_json(&output::task_to_json(task, categories));
    } else {
        output::print_task_detail(task, categories);
    }
    Ok(())
}

async fn cmd_done(args: DoneArgs, tasks: &mut TaskStore, json: bool) -> Result<(), CliError> {
    let id = resolve_task_id(tasks, &args.id)?;
    let Some(task) = tasks.toggle_completion(&id).await.map_err(save_failed)? else {
        return Err(format!("task not found: {}", args.id).into());
    };
    if json {
        output::print_json(&serde_json::json!({"id": task.id, "completed": task.completed}));
    } else if task.completed {
        println!("completed: {}", task.title);
    } else {
        println!("reopened: {}", task.title);
    }
    Ok(())
}

async fn cmd_edit(
    args: EditArgs,
    tasks: &mut TaskStore,
    categories: &CategoryStore,
    gate: &FlagGate,
    json: bool,
) -> Result<(), CliError> {
    let id = resolve_task_id(tasks, &args.id)?;

    let mut patch = TaskPatch::default();
    if let Some(title) = args.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err("title cannot be empty".into());
        }
        patch.title = Some(title);
    }
    if let Some(desc) = args.desc {
        patch.description = Some(Some(desc));
    } else if args.no_desc {
        patch.description = Some(None);
    }
    if let Some(priority) = args.priority {
        patch.priority = Some(Some(priority));
    } else if args.no_priority {
        patch.priority = Some(None);
    }
    if let Some(due) = args.due.as_deref() {
        patch.due_date = Some(Some(parse_due(due)?));
    } else if args.no_due {
        patch.due_date = Some(None);
    }
    if let Some(input) = args.category.as_deref() {
        require_categories(gate)?;
        patch.category_id = Some(Some(resolve_category_id(categories, input)?));
    } else if args.no_category {
        patch.category_id = Some(None);
    }

    let Some(task) = tasks.update(&id, patch).await.map_err(save_failed)? else {
        return Err(format!("task not found: {}", args.id).into());
    };
    if json {
        output::print_json(&output::task_to_json(&task, categories));
    } else {
        println!("updated {} ({})", task.id, task.title);
    }
    Ok(())
}

async fn cmd_rm(args: RmArgs, tasks: &mut TaskStore) -> Result<(), CliError> {
    let id = resolve_task_id(tasks, &args.id)?;
    if tasks.delete(&id).await.map_err(save_failed)? {
        println!("deleted {}", id);
        Ok(())
    } else {
        Err(format!("task not found: {}", args.id).into())
    }
}

async fn cmd_clear_done(tasks: &mut TaskStore) -> Result<(), CliError> {
    let removed = tasks.clear_completed().await.map_err(save_failed)?;
    match removed {
        0 => println!("no completed tasks to clear"),
        1 => println!("cleared 1 completed task"),
        n => println!("cleared {} completed tasks", n),
    }
    Ok(())
}

fn cmd_stats(tasks: &TaskStore, gate: &FlagGate, json: bool) -> Result<(), CliError> {
    if !gate.statistics_enabled() {
        return Err("statistics are disabled".into());
    }
    let stats = tasks.stats();
    if json {
        output::print_json(&stats);
    } else {
        output::print_stats(&stats);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Category commands
// ---------------------------------------------------------------------------

async fn cmd_cat(
    cmd: CatCommands,
    categories: &mut CategoryStore,
    gate: &FlagGate,
    json: bool,
) -> Result<(), CliError> {
    require_categories(gate)?;
    match cmd {
        CatCommands::List => {
            if json {
                let list = categories.all().iter().map(output::category_to_json).collect();
                output::print_json(&CategoryListJson { categories: list });
            } else {
                for category in categories.all() {
                    output::print_category_line(category);
                }
            }
            Ok(())
        }
        CatCommands::Add(args) => cmd_cat_add(args, categories, json).await,
        CatCommands::Edit(args) => cmd_cat_edit(args, categories, json).await,
        CatCommands::Rm(args) => cmd_cat_rm(args, categories).await,
        CatCommands::Colors => {
            print_palette(categories.available_colors(), json);
            Ok(())
        }
        CatCommands::Icons => {
            print_palette(categories.available_icons(), json);
            Ok(())
        }
    }
}

fn print_palette(values: &[&str], json: bool) {
    if json {
        output::print_json(&PaletteJson {
            values: values.iter().map(|v| v.to_string()).collect(),
        });
    } else {
        for value in values {
            println!("{}", value);
        }
    }
}

async fn cmd_cat_add(
    args: CatAddArgs,
    categories: &mut CategoryStore,
    json: bool,
) -> Result<(), CliError> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err("category name cannot be empty".into());
    }
    if categories.exists(name, None) {
        return Err(format!("a category named '{}' already exists", name).into());
    }
    let color = match args.color.as_deref() {
        Some(color) => validate_color(color)?,
        None => AVAILABLE_COLORS[0].to_string(),
    };
    let icon = args.icon.as_deref().map(validate_icon).transpose()?;

    let category = categories
        .add(NewCategory {
            name: name.to_string(),
            color,
            icon,
        })
        .await
        .map_err(save_failed)?;

    if json {
        output::print_json(&output::category_to_json(&category));
    } else {
        println!("added category {} ({})", category.id, category.name);
    }
    Ok(())
}

async fn cmd_cat_edit(
    args: CatEditArgs,
    categories: &mut CategoryStore,
    json: bool,
) -> Result<(), CliError> {
    let id = resolve_category_id(categories, &args.category)?;

    let mut patch = CategoryPatch::default();
    if let Some(name) = args.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err("category name cannot be empty".into());
        }
        if categories.exists(&name, Some(&id)) {
            return Err(format!("a category named '{}' already exists", name).into());
        }
        patch.name = Some(name);
    }
    if let Some(color) = args.color.as_deref() {
        patch.color = Some(validate_color(color)?);
    }
    if let Some(icon) = args.icon.as_deref() {
        patch.icon = Some(Some(validate_icon(icon)?));
    } else if args.no_icon {
        patch.icon = Some(None);
    }

    let Some(category) = categories.update(&id, patch).await.map_err(save_failed)? else {
        return Err(format!("category not found: {}", args.category).into());
    };
    if json {
        output::print_json(&output::category_to_json(&category));
    } else {
        println!("updated category {} ({})", category.id, category.name);
    }
    Ok(())
}

async fn cmd_cat_rm(args: CatRmArgs, categories: &mut CategoryStore) -> Result<(), CliError> {
    let id = resolve_category_id(categories, &args.category)?;
    let name = categories
        .by_id(&id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.clone());
    if categories.delete(&id).await.map_err(save_failed)? {
        println!("deleted category {}; its tasks are now uncategorized", name);
        Ok(())
    } else {
        Err(format!("category not found: {}", args.category).into())
    }
}
