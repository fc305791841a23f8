use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use factly_client::{delete_fact, CreateForm, EditSession, FactsBackend, HttpBackend, ListState};
use factly_core::{CategoryFilter, Fact, FactId, KNOWN_CATEGORIES};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "factly")]
#[command(about = "Factly bulletin CLI")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:4017")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    List(ListArgs),
    Add(AddArgs),
    Edit(EditArgs),
    Delete(DeleteArgs),
    /// Print the conventional category set offered by the picker.
    Categories,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    category: Option<String>,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    content: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    source: Option<String>,
}

#[derive(Debug, Args)]
struct EditArgs {
    id: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    source: Option<String>,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    id: String,
    /// Skip the interactive confirmation prompt.
    #[arg(long, default_value_t = false)]
    yes: bool,
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn fact_json(fact: &Fact) -> Result<Value> {
    serde_json::to_value(fact).map_err(Into::into)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let backend = HttpBackend::new(&cli.base_url);
    match cli.command {
        Command::List(args) => run_list(&args, &backend),
        Command::Add(args) => run_add(&args, &backend),
        Command::Edit(args) => run_edit(&args, &backend),
        Command::Delete(args) => run_delete(&args, &backend),
        Command::Categories => emit_json(serde_json::json!(KNOWN_CATEGORIES)),
    }
}

fn run_list(args: &ListArgs, backend: &impl FactsBackend) -> Result<()> {
    let mut list = ListState::new();
    list.load(backend);
    if let Some(message) = list.error.clone() {
        bail!(message);
    }

    let filter = match args.category.as_deref() {
        Some(category) => CategoryFilter::Category(category.to_string()),
        None => CategoryFilter::All,
    };
    list.set_filter(filter);

    let facts = list.visible().into_iter().map(fact_json).collect::<Result<Vec<_>>>()?;
    emit_json(Value::Array(facts))
}

fn run_add(args: &AddArgs, backend: &impl FactsBackend) -> Result<()> {
    let mut list = ListState::new();
    let mut form = CreateForm::new();
    form.set_content(&args.content);
    if let Some(category) = args.category.as_deref() {
        form.set_category(category);
    }
    if let Some(source) = args.source.as_deref() {
        form.set_source(source);
    }

    match form.submit(backend, &mut list) {
        Some(fact) => emit_json(fact_json(&fact)?),
        None => Err(anyhow!(form
            .error
            .unwrap_or_else(|| "Failed to add fact".to_string()))),
    }
}

fn run_edit(args: &EditArgs, backend: &impl FactsBackend) -> Result<()> {
    let id = parse_fact_id(&args.id)?;
    let mut list = ListState::new();
    list.load(backend);
    if let Some(message) = list.error.clone() {
        bail!(message);
    }

    let target = list
        .facts()
        .iter()
        .find(|fact| fact.id == id)
        .cloned()
        .ok_or_else(|| anyhow!("Fact not found"))?;

    let mut session = EditSession::new();
    session.begin(&target);
    session.set_content(&args.content);
    session.set_category(args.category.as_deref().unwrap_or_default());
    session.set_source(args.source.as_deref().unwrap_or_default());

    match session.save(backend, &mut list) {
        Some(updated) => emit_json(fact_json(&updated)?),
        None => Err(anyhow!(session
            .error
            .unwrap_or_else(|| "Failed to update fact".to_string()))),
    }
}

fn run_delete(args: &DeleteArgs, backend: &impl FactsBackend) -> Result<()> {
    let id = parse_fact_id(&args.id)?;
    let mut list = ListState::new();
    let confirmed = args.yes || confirm_delete()?;

    match delete_fact(backend, &mut list, id, confirmed) {
        Ok(true) => emit_json(serde_json::json!({ "success": true })),
        Ok(false) => emit_json(serde_json::json!({ "success": false, "cancelled": true })),
        Err(err) => Err(anyhow!(err.to_string())),
    }
}

fn confirm_delete() -> Result<bool> {
    print!("Are you sure you want to delete this fact? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn parse_fact_id(value: &str) -> Result<FactId> {
    FactId::parse(value).ok_or_else(|| anyhow!("invalid fact id: {value}"))
}
