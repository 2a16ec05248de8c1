use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hostdb_ui::catalog::sorted_catalog;
use hostdb_ui::config::default_config_path;
use hostdb_ui::form::ClauseView;
use hostdb_ui::pagination::{MultiQuery, multi_query};
use hostdb_ui::render::{render_form, render_pagination};
use hostdb_ui::{
    CatalogSource, HttpCatalog, JsonTree, PageHost, Pagination, SearchForm, SearchFormController,
    UiConfig, load_config, merge_url_parameters,
};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostdb-ui", about = "Drive the hostdb search page controllers", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Path to a YAML config (defaults to ~/.hostdb/ui.yml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log controller activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the search form from a page query string.
    Form {
        /// Query string, with or without the leading `?`.
        #[arg(default_value = "")]
        query: String,
        /// Print the form rows as HTML.
        #[arg(long)]
        html: bool,
    },
    /// Overlay parameters onto the query string of a URL.
    Merge {
        url: String,
        /// Parameter to set, as KEY=VALUE. Repeatable.
        #[arg(short, long = "set", value_parser = parse_pair)]
        set: Vec<(String, String)>,
    },
    /// Fetch the value catalog for a search field.
    Catalog {
        key: String,
    },
    /// Pick a random field and value and print the search location.
    Lucky,
    /// Render a JSON document as an expanded detail tree.
    Detail {
        /// Inline JSON document.
        #[arg(conflicts_with = "file")]
        json_text: Option<String>,
        /// Read the document from a file instead.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show page navigation for a result listing.
    Pages {
        #[arg(long)]
        count: usize,
        /// Page size; defaults to the configured limit.
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Current query string.
        #[arg(default_value = "")]
        query: String,
        /// Print the navigation as HTML.
        #[arg(long)]
        html: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = resolve_config(cli.config.as_ref())?;

    match cli.command {
        Command::Form { query, html } => handle_form(&config, &query, html, cli.json),
        Command::Merge { url, set } => handle_merge(&url, &set, cli.json),
        Command::Catalog { key } => handle_catalog(&config, &key, cli.json).await,
        Command::Lucky => handle_lucky(&config, cli.json).await,
        Command::Detail { json_text, file } => handle_detail(json_text, file, cli.json),
        Command::Pages {
            count,
            limit,
            offset,
            query,
            html,
        } => handle_pages(&config, count, limit, offset, &query, html, cli.json),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(explicit: Option<&PathBuf>) -> Result<UiConfig, Box<dyn Error>> {
    let config = match explicit {
        Some(path) => load_config(path, false)?,
        None => match default_config_path() {
            Some(path) => load_config(&path, true)?,
            None => UiConfig::default(),
        },
    };
    let config = config.with_env_overrides();
    debug!(server = %config.server_url, fields = config.fields.len(), "config loaded");
    Ok(config)
}

fn handle_form(
    config: &UiConfig,
    query: &str,
    html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let directory = config.field_directory();
    let form = SearchForm::from_location(directory.clone(), query.trim_start_matches('?'));
    let views = form.views();

    if as_json {
        let payload = json!({
            "clauses": views,
            "submission": form.submission_query(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if html {
        println!("{}", render_form(&views, &directory));
    } else {
        print_clause_table(&views);
    }
    Ok(())
}

fn handle_merge(url: &str, set: &[(String, String)], as_json: bool) -> Result<(), Box<dyn Error>> {
    let merged = merge_url_parameters(url, set.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if as_json {
        let payload = json!({ "url": url, "merged": merged });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{merged}");
    }
    Ok(())
}

async fn handle_catalog(config: &UiConfig, key: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let catalog = HttpCatalog::new(&config.server_url)?;
    let values = sorted_catalog(catalog.fetch(key).await?);

    if as_json {
        let payload = json!({ "key": key, "count": values.len(), "catalog": values });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if values.is_empty() {
        println!("No catalog values for \"{key}\".");
    } else {
        println!("Catalog for \"{key}\" ({} values):", values.len());
        for value in &values {
            println!("  {value}");
        }
    }
    Ok(())
}

/// Prints navigations to stdout and notices to stderr.
struct ConsolePage {
    json: bool,
}

impl PageHost for ConsolePage {
    fn navigate(&self, location: &str) {
        if self.json {
            println!("{}", json!({ "location": location }));
        } else {
            println!("{location}");
        }
    }

    fn notify(&self, message: &str) {
        eprintln!("notice: {message}");
    }
}

async fn handle_lucky(config: &UiConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let catalog = HttpCatalog::new(&config.server_url)?;
    let controller = SearchFormController::new(
        config.field_directory(),
        catalog,
        Arc::new(ConsolePage { json: as_json }),
    );
    controller.feeling_lucky().await?;
    Ok(())
}

fn handle_detail(
    json_text: Option<String>,
    file: Option<PathBuf>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let text = match (json_text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|err| format!("failed to read '{}': {err}", path.display()))?,
        (None, None) => return Err("Provide a JSON document or --file".into()),
    };

    if as_json {
        let value: serde_json::Value = serde_json::from_str(&text)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let mut tree = JsonTree::parse(&text)?;
        tree.expand();
        println!("{}", tree.render_text());
    }
    Ok(())
}

fn handle_pages(
    config: &UiConfig,
    count: usize,
    limit: Option<usize>,
    offset: usize,
    query: &str,
    html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let limit = limit.unwrap_or(config.default_limit);
    let pagination = Pagination::new(count, limit, offset);
    let query: MultiQuery = multi_query(query.trim_start_matches('?'));
    let links = pagination.links(&query);

    if as_json {
        let payload = json!({
            "count": count,
            "limit": limit,
            "offset": offset,
            "total_pages": pagination.total_pages(),
            "current_page": pagination.current_page(),
            "links": links,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if html {
        println!("{}", render_pagination(&links));
    } else if links.is_empty() {
        println!("Nothing to page through.");
    } else {
        println!(
            "Page {} of {}",
            pagination.current_page(),
            pagination.total_pages()
        );
        for link in &links {
            println!("  {}", describe_link(link));
        }
    }
    Ok(())
}

fn describe_link(link: &hostdb_ui::PageLink) -> String {
    use hostdb_ui::PageLink;
    match link {
        PageLink::Previous { href, disabled } => {
            format!("previous  {href}{}", if *disabled { " (disabled)" } else { "" })
        }
        PageLink::Page {
            number,
            href,
            active,
        } => format!("{number:<8}  {href}{}", if *active { " (current)" } else { "" }),
        PageLink::Gap => "...".to_string(),
        PageLink::Next { href, disabled } => {
            format!("next      {href}{}", if *disabled { " (disabled)" } else { "" })
        }
    }
}

fn print_clause_table(views: &[ClauseView]) {
    if views.is_empty() {
        println!("No clauses.");
        return;
    }
    let key_width = views
        .iter()
        .map(|view| view.key.as_deref().unwrap_or("-").len())
        .max()
        .unwrap_or(3)
        .max("KEY".len());
    let label_width = views
        .iter()
        .map(|view| view.label.len())
        .max()
        .unwrap_or(5)
        .max("LABEL".len());
    println!(
        "{:<key_width$}  {:<label_width$}  {:<6}  {}",
        "KEY", "LABEL", "ACTION", "VALUE"
    );
    println!(
        "{:-<key_width$}  {:-<label_width$}  {:-<6}  {}",
        "", "", "", "-----"
    );
    for view in views {
        let action = if view.is_last() { "add" } else { "remove" };
        println!(
            "{:<key_width$}  {:<label_width$}  {:<6}  {}",
            view.key.as_deref().unwrap_or("-"),
            view.label,
            action,
            view.value
        );
    }
}
