use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use opencal::{
    CalendarEvent, CalendarSource,
    aggregate::{Aggregator, CalendarState},
    config::Settings,
    parse_with,
    source::{DEFAULT_COLOR, FALLBACK_COLOR, parse_hex_color},
    types::Tz,
    view::{
        MonthGrid, ViewMode, filter_events, group_by_day, render_event, render_list, render_month,
    },
};
use owo_colors::OwoColorize;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "opencal")]
#[command(about = "Aggregate your ICS calendar feeds in the terminal")]
struct Cli {
    /// Settings file (defaults to ~/.config/opencal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Events of a month, grouped by day
    List {
        /// Month to show (YYYY-MM), the current one by default
        #[arg(long)]
        month: Option<String>,
    },
    /// Month grid
    Month {
        /// Month to show (YYYY-MM), the current one by default
        #[arg(long)]
        month: Option<String>,

        /// First day of the week
        #[arg(long, default_value = "mon")]
        week_start: Weekday,
    },
    /// Events of the coming 31 days
    Upcoming,
    /// Details of an event, by uid or by part of its title
    Show { query: String },
    /// Parse a local ICS file
    Parse {
        file: PathBuf,

        /// Source id the events are tagged with
        #[arg(long, default_value = "local")]
        source: String,

        /// Print the events as JSON
        #[arg(long, conflicts_with = "details")]
        json: bool,

        /// Print every event with its description
        #[arg(long)]
        details: bool,
    },
    /// List configured calendars
    Sources,
    /// Add a calendar
    Add {
        name: String,

        /// Feed URL (http(s):// or webcal://)
        #[arg(long)]
        url: Option<String>,

        #[arg(long, default_value = DEFAULT_COLOR)]
        color: String,
    },
    /// Remove a calendar
    Remove { id: String },
    /// Enable or disable a calendar
    Toggle { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load(&path)?;

    match cli.command {
        Commands::List { month } => {
            let anchor = parse_month(month.as_deref())?;
            show(&settings, ViewMode::List, anchor, Weekday::Mon).await
        }
        Commands::Month { month, week_start } => {
            let anchor = parse_month(month.as_deref())?;
            show(&settings, ViewMode::Month, anchor, week_start).await
        }
        Commands::Upcoming => show(&settings, ViewMode::Upcoming, None, Weekday::Mon).await,
        Commands::Show { query } => show_event(&settings, &query).await,
        Commands::Parse {
            file,
            source,
            json,
            details,
        } => parse_file(&settings, &file, &source, json, details),
        Commands::Sources => {
            print_sources(&settings.sources);
            Ok(())
        }
        Commands::Add { name, url, color } => {
            if parse_hex_color(&color).is_none() {
                anyhow::bail!("Invalid color '{color}', expected #rrggbb");
            }
            let source = CalendarSource::new(&name)
                .with_url(url.as_deref().unwrap_or_default())
                .with_color(&color);
            println!("Added {} {}", source.name.bold(), source.id.dimmed());
            settings.add_source(source);
            save(&settings, &path)
        }
        Commands::Remove { id } => {
            let source = settings.remove_source(&id)?;
            println!("Removed {}", source.name.bold());
            save(&settings, &path)
        }
        Commands::Toggle { id } => {
            let enabled = settings.toggle_source(&id)?;
            println!("{id}: {}", if enabled { "enabled" } else { "disabled" });
            save(&settings, &path)
        }
    }
}

/// First day of the `YYYY-MM` month.
fn parse_month(month: Option<&str>) -> Result<Option<NaiveDate>> {
    month
        .map(|month| {
            NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
                .with_context(|| format!("Invalid month '{month}', expected YYYY-MM"))
        })
        .transpose()
}

fn now(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Fetch the enabled calendars and report the ones that failed. Returns the state and the
/// display timezone.
async fn refresh(settings: &Settings) -> Result<(CalendarState, Tz)> {
    if settings.sources.is_empty() {
        anyhow::bail!(
            "No calendars configured.\n\n\
            Add one with:\n  \
            opencal add <NAME> --url <URL>"
        );
    }

    let aggregator = Aggregator::from_settings(settings)?;
    let mut state = CalendarState::new();
    state.refresh_if_changed(settings, &aggregator).await;

    for failure in &state.failures {
        let name = settings
            .source(&failure.source_id)
            .map_or(failure.source_id.as_str(), |source| source.name.as_str());
        eprintln!("{} {name}: {}", "Failed to load".red(), failure.error);
    }
    Ok((state, aggregator.options().timezone))
}

fn updated_label(last_updated: Option<DateTime<Utc>>, tz: Tz) -> Option<String> {
    last_updated.map(|updated| format!("Updated {}", updated.with_timezone(&tz).format("%H:%M")))
}

fn print_last_updated(state: &CalendarState, tz: Tz) {
    if let Some(label) = updated_label(state.last_updated, tz) {
        println!("\n{}", label.dimmed());
    }
}

async fn show(
    settings: &Settings,
    mode: ViewMode,
    anchor: Option<NaiveDate>,
    week_start: Weekday,
) -> Result<()> {
    let (state, tz) = refresh(settings).await?;

    let now = now(tz);
    let today = now.date_naive();
    let anchor = anchor.unwrap_or(today);
    let events = filter_events(&state.events, mode, anchor, now);

    match mode {
        ViewMode::Month => {
            let grid = MonthGrid::new(anchor, week_start, events, today);
            print!("{}", render_month(&grid));
        }
        ViewMode::List | ViewMode::Upcoming => {
            let title = match mode {
                ViewMode::List => anchor.format("%B %Y").to_string(),
                _ => "Upcoming".to_owned(),
            };
            println!("{}\n", title.bold());
            print!("{}", render_list(&group_by_day(events), &settings.sources));
        }
    }
    print_last_updated(&state, tz);
    Ok(())
}

/// The event with uid `query`, or else every event whose title contains it.
fn find_events<'a>(events: &'a [CalendarEvent], query: &str) -> Vec<&'a CalendarEvent> {
    if let Some(event) = events.iter().find(|event| event.uid == query) {
        return vec![event];
    }
    let query = query.to_lowercase();
    events
        .iter()
        .filter(|event| event.summary.to_lowercase().contains(&query))
        .collect()
}

async fn show_event(settings: &Settings, query: &str) -> Result<()> {
    let (state, tz) = refresh(settings).await?;

    let found = find_events(&state.events, query);
    if found.is_empty() {
        anyhow::bail!("No event matches '{query}'");
    }
    print_details(&found, &settings.sources);
    print_last_updated(&state, tz);
    Ok(())
}

fn print_details(events: &[&CalendarEvent], sources: &[CalendarSource]) {
    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            println!("{}", "─".repeat(40).dimmed());
        }
        print!("{}", render_event(event, sources));
    }
}

fn parse_file(
    settings: &Settings,
    file: &Path,
    source_id: &str,
    json: bool,
    details: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Could not read {}", file.display()))?;
    let events: Vec<CalendarEvent> = parse_with(&text, source_id, &settings.parser_options()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if details {
        print_details(&events.iter().collect::<Vec<_>>(), &settings.sources);
    } else {
        print!("{}", render_list(&group_by_day(&events), &settings.sources));
    }
    Ok(())
}

fn print_sources(sources: &[CalendarSource]) {
    if sources.is_empty() {
        println!("{}", "No calendars configured".dimmed());
        return;
    }

    for source in sources {
        let (r, g, b) = source
            .rgb()
            .or_else(|| parse_hex_color(FALLBACK_COLOR))
            .unwrap_or_default();
        let state = if source.enabled { "on " } else { "off" };
        let url = if source.url.is_empty() {
            "(from environment)"
        } else {
            source.url.as_str()
        };
        println!(
            "{} {} {} {} {}",
            "●".truecolor(r, g, b),
            state,
            source.name.bold(),
            source.id.dimmed(),
            url.dimmed()
        );
    }
}

fn save(settings: &Settings, path: &Path) -> Result<()> {
    settings.save(path)?;
    println!("{}", format!("Saved {}", path.display()).dimmed());
    Ok(())
}
