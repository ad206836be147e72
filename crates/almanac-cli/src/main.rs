//! `almanac` CLI: query, expand, and convert calendar files from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Occurrences of every event in March (ICS from a file)
//! almanac expand -i team.ics --from 2026-03-01 --to 2026-03-31
//!
//! # Overlapping pairs, as JSON
//! almanac conflicts -i events.json --json
//!
//! # Month view (JSON piped on stdin)
//! cat events.json | almanac month --year 2026 --month 3
//!
//! # Free slots of at least an hour during a working day
//! almanac free -i team.ics --from 2026-03-02T09:00 --to 2026-03-02T17:00 --min-minutes 60
//!
//! # Normalize a rule, number a week, convert between formats
//! almanac rule 'RRULE:INTERVAL=2;FREQ=WEEKLY;BYDAY=MO'
//! almanac week 2026-01-01
//! almanac convert -i team.ics --to json -o team.json
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use almanac_engine::time::end_of_day;
use almanac_engine::{
    find_conflicting_pairs, format_rule, parse_rule, parse_timestamp, week_number, week_year,
    BusyPolicy, EngineConfig, EventStore, GridCell, MonthGrid, Occurrence,
};
use almanac_formats::{Format, UidAllocator};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "almanac", version, about = "Calendar event engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where events come from.
#[derive(Args)]
struct Source {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Input format: ics or json (guessed from the file extension or content if omitted)
    #[arg(long)]
    format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List occurrences of every event within a window
    Expand {
        #[command(flatten)]
        source: Source,
        /// Window start (a date means its midnight)
        #[arg(long)]
        from: String,
        /// Window end (a date means the end of that day)
        #[arg(long)]
        to: String,
        /// Cap on occurrences per event (defaults to the configured value)
        #[arg(long)]
        max: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List every pair of overlapping events
    Conflicts {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
    /// Show a month grid
    Month {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        year: i32,
        /// 1-based month
        #[arg(long)]
        month: u32,
        /// Date to mark as today (defaults to the local date)
        #[arg(long)]
        today: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Find events by text and/or category
    Search {
        #[command(flatten)]
        source: Source,
        /// Case-insensitive substring of title, description, or location
        query: Option<String>,
        /// Keep only events in any of these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// List free slots between events within a window
    Free {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Only report slots at least this long
        #[arg(long, default_value_t = 0)]
        min_minutes: i64,
        /// Count all-day events as busy
        #[arg(long)]
        all_day_busy: bool,
        /// Busy minutes for a timed event without an end
        #[arg(long, default_value_t = 0)]
        open_ended_minutes: i64,
        #[arg(long)]
        json: bool,
    },
    /// Parse a recurrence rule and print its canonical form
    Rule {
        /// Rule text, with or without the RRULE: prefix
        text: String,
    },
    /// Print the ISO week of a date as YYYY-Www
    Week {
        date: String,
    },
    /// Convert between ICS and JSON
    Convert {
        #[command(flatten)]
        source: Source,
        /// Output format: ics or json
        #[arg(long)]
        to: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Expand {
            source,
            from,
            to,
            max,
            json,
        } => {
            let store = load_store(&source, &config)?;
            let (from, to) = parse_window(&from, &to)?;
            let mut options = config.expand_options();
            if let Some(max) = max {
                options = options.with_max_occurrences(max);
            }
            let occurrences = store.occurrences_in_range(from, to, options);
            if json {
                print_json(&occurrences)?;
            } else {
                for occurrence in &occurrences {
                    println!("{}", occurrence_line(occurrence));
                }
            }
        }
        Commands::Conflicts { source, json } => {
            let store = load_store(&source, &config)?;
            let conflicts = find_conflicting_pairs(store.as_slice());
            if json {
                print_json(&conflicts)?;
            } else {
                for c in &conflicts {
                    println!(
                        "{} ({}) overlaps {} ({}) by {} min",
                        c.event_a.title, c.event_a.uid, c.event_b.title, c.event_b.uid, c.overlap_minutes
                    );
                }
            }
        }
        Commands::Month {
            source,
            year,
            month,
            today,
            json,
        } => {
            let store = load_store(&source, &config)?;
            let today = match today {
                Some(text) => parse_date(&text)?,
                None => Local::now().date_naive(),
            };
            let grid = store.month_grid_at(year, month, today)?;
            if json {
                print_json(&grid)?;
            } else {
                print!("{}", render_grid(&grid));
            }
        }
        Commands::Search {
            source,
            query,
            categories,
            json,
        } => {
            let store = load_store(&source, &config)?;
            let wanted: Vec<&str> = categories.iter().map(String::as_str).collect();
            let mut found = if wanted.is_empty() {
                store.search(query.as_deref().unwrap_or(""))
            } else {
                store.filter_by_category(&wanted)
            };
            if let (Some(query), false) = (&query, wanted.is_empty()) {
                let hits: Vec<String> = store.search(query).into_iter().map(|e| e.uid).collect();
                found.retain(|e| hits.contains(&e.uid));
            }
            if json {
                print_json(&found)?;
            } else {
                for event in &found {
                    println!("{}  {}  [{}]", span(event.start, event.end), event.title, event.uid);
                }
            }
        }
        Commands::Free {
            source,
            from,
            to,
            min_minutes,
            all_day_busy,
            open_ended_minutes,
            json,
        } => {
            let store = load_store(&source, &config)?;
            let (from, to) = parse_window(&from, &to)?;
            let policy = BusyPolicy::default()
                .with_all_day_blocks(all_day_busy)
                .with_open_ended_minutes(open_ended_minutes);
            let view = store.free_busy(from, to, config.expand_options(), policy);
            debug!(
                busy_minutes = view.busy_minutes(),
                blocks = view.busy.len(),
                "computed free/busy"
            );
            let mut slots = view.free;
            slots.retain(|s| s.duration_minutes >= min_minutes);
            if json {
                print_json(&slots)?;
            } else {
                for slot in &slots {
                    println!("{}  ({} min)", span(slot.start, Some(slot.end)), slot.duration_minutes);
                }
            }
        }
        Commands::Rule { text } => {
            let rule = parse_rule(&text).with_context(|| format!("Invalid rule: {text}"))?;
            println!("{}", format_rule(&rule));
        }
        Commands::Week { date } => {
            let date = parse_date(&date)?;
            println!("{}-W{:02}", week_year(date), week_number(date));
        }
        Commands::Convert { source, to, output } => {
            let target: Format = to.parse()?;
            let store = load_store(&source, &config)?;
            let text = target
                .write(store.as_slice())
                .context("Failed to write events")?;
            write_output(output.as_deref(), &text)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `-v`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_store(source: &Source, config: &EngineConfig) -> Result<EventStore> {
    let text = read_input(source.input.as_deref())?;
    let format = match (&source.format, &source.input) {
        (Some(name), _) => name.parse()?,
        (None, Some(path)) => Format::from_path(path).unwrap_or_else(|| sniff(&text)),
        (None, None) => sniff(&text),
    };
    debug!(%format, "reading events");

    let mut uids = UidAllocator::new(config.uid_domain.clone());
    let events = format
        .read(&text, &mut uids)
        .with_context(|| format!("Failed to read {format} input"))?;
    Ok(EventStore::from_events(events))
}

/// iCalendar text starts with a BEGIN line; anything else is treated as JSON.
fn sniff(text: &str) -> Format {
    let head = text.trim_start().get(..6).unwrap_or("");
    if head.eq_ignore_ascii_case("BEGIN:") {
        Format::Ics
    } else {
        Format::Json
    }
}

fn parse_window(from: &str, to: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let start = parse_timestamp(from).with_context(|| format!("Invalid --from: {from}"))?;
    let end = parse_timestamp(to).with_context(|| format!("Invalid --to: {to}"))?;
    let end_at = if end.date_only {
        end_of_day(end.at.date())
    } else {
        end.at
    };
    if end_at < start.at {
        bail!("--to ({to}) is before --from ({from})");
    }
    Ok((start.at, end_at))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    let parsed = parse_timestamp(text).with_context(|| format!("Invalid date: {text}"))?;
    Ok(parsed.at.date())
}

fn span(start: NaiveDateTime, end: Option<NaiveDateTime>) -> String {
    let start_text = start.format("%Y-%m-%d %H:%M").to_string();
    match end {
        Some(end) if end.date() == start.date() => format!("{start_text}-{}", end.format("%H:%M")),
        Some(end) => format!("{start_text} - {}", end.format("%Y-%m-%d %H:%M")),
        None => start_text,
    }
}

fn occurrence_line(occurrence: &Occurrence) -> String {
    let marker = if occurrence.is_recurring { " (recurring)" } else { "" };
    format!(
        "{}  {}{}  [{}]",
        span(occurrence.start(), occurrence.end()),
        occurrence.event.title,
        marker,
        occurrence.uid()
    )
}

/// Sunday-first text calendar; days with events carry a `*`.
fn render_grid(grid: &MonthGrid) -> String {
    let mut out = String::new();
    let title = NaiveDate::from_ymd_opt(grid.year, grid.month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    out.push_str(&format!("{title:^28}\n"));
    out.push_str(" Su  Mo  Tu  We  Th  Fr  Sa\n");
    for week in grid.weeks() {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                GridCell::Blank => "    ".to_string(),
                GridCell::Day(day) => {
                    let mark = if day.is_today {
                        '<'
                    } else if day.events.is_empty() {
                        ' '
                    } else {
                        '*'
                    };
                    format!(" {:>2}{mark}", day.date.day())
                }
            })
            .collect();
        out.push_str(row.concat().trim_end());
        out.push('\n');
    }
    out.push_str(&format!("{} events\n", grid.total_events));
    out
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        None => {
            print!("{content}");
        }
    }
    Ok(())
}
