//! Command-line front end for the logbook editor.
//!
//! A thin shim over the library: each subcommand opens the application
//! state, performs one user action and shuts it down again.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use logbook::app::AppState;
use logbook::config::{AppConfig, DEFAULT_DATA_DIR};
use logbook::database::{LogbookEntry, Week, Weekday};
use logbook::error::{AppError, ErrorKind};
use logbook::render::{PdfiumRenderer, ZoomLevel};
use logbook::services::{CreateOutcome, EditTarget, LogbookService, Marker, NewUpload};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scanned PDF logbooks with weekly and daily annotations.
#[derive(Parser, Debug)]
#[command(name = "logbook", version, arg_required_else_help = true)]
struct Cli {
    /// Directory holding the database and stored PDFs.
    #[arg(long, env = "LOGBOOK_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    /// pdfium shared library or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH", global = true)]
    pdfium_library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a PDF logbook and create its week skeleton.
    Upload {
        pdf: PathBuf,
        /// First day of the logbook (YYYY-MM-DD). Default: today.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of the logbook (YYYY-MM-DD). Default: seven days per page.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// List stored logbook entries.
    List,

    /// Print the weeks of an entry.
    Show {
        internal_id: String,
        /// Only this week (numbered from 1).
        #[arg(long)]
        week: Option<u32>,
    },

    /// Render one PDF page to a PNG file.
    Render {
        internal_id: String,
        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Zoom factor: 0.5, 1.0, 1.5, 2.0 or 3.0.
        #[arg(long, default_value = "1.0")]
        zoom: ZoomLevel,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Edit the weekly goal or a day of one week, then save.
    Edit {
        internal_id: String,
        /// Week number, starting at 1.
        #[arg(long)]
        week: u32,
        /// New weekly goal.
        #[arg(long)]
        goal: Option<String>,
        /// Day to edit (Monday..Friday). Markers go to the weekly goal without it.
        #[arg(long)]
        day: Option<Weekday>,
        /// New text for --day.
        #[arg(long, requires = "day")]
        text: Option<String>,
        /// Append a marker: name, illegible or no-entry. Repeatable.
        #[arg(long = "mark")]
        marks: Vec<Marker>,
    },

    /// Print the stored JSON document of an entry.
    Export { internal_id: String },

    /// List stored PDFs that no entry references.
    Orphans,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logbook=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::new(cli.data_dir).with_pdfium_library(cli.pdfium_library);
    let renderer = Arc::new(PdfiumRenderer::new(config.pdfium_library.clone()));

    let state = AppState::initialize(config, renderer)
        .await
        .context("Failed to open logbook storage")?;

    let result = dispatch(&state.logbook_service, cli.command).await;

    state.shutdown().await;
    result
}

async fn dispatch(service: &LogbookService, command: Command) -> Result<()> {
    match command {
        Command::Upload { pdf, start, end } => upload(service, pdf, start, end).await,
        Command::List => {
            for entry in service.list_entries().await? {
                println!("{}  {}", entry.internal_id, entry.id);
            }
            Ok(())
        }
        Command::Show { internal_id, week } => {
            let entry = service.get_entry(&internal_id).await?;
            print_entry(&entry, week)
        }
        Command::Render {
            internal_id,
            page,
            zoom,
            output,
        } => {
            service.open_entry(&internal_id).await?;
            let rendered = service
                .render_page(&internal_id, page as usize - 1, zoom)
                .await?;
            tokio::fs::write(&output, &rendered.png)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Page {} at {} ({}x{} px) written to {}",
                page,
                zoom,
                rendered.width,
                rendered.height,
                output.display()
            );
            Ok(())
        }
        Command::Edit {
            internal_id,
            week,
            goal,
            day,
            text,
            marks,
        } => {
            service.open_entry(&internal_id).await?;

            if let Some(goal) = goal {
                service.set_weekly_goal(&internal_id, week, goal)?;
            }
            if let (Some(weekday), Some(text)) = (day, text) {
                service.set_day_text(&internal_id, week, weekday, text)?;
            }

            let target = match day {
                Some(weekday) => EditTarget::Day { week, weekday },
                None => EditTarget::WeeklyGoal { week },
            };
            for marker in marks {
                service.append_marker(&internal_id, target, marker)?;
            }

            if !service.has_unsaved_changes(&internal_id) {
                println!("Nothing to change");
                return Ok(());
            }

            let saved = service.save(&internal_id).await?;
            println!("Changes saved");
            print_entry(&saved, Some(week))
        }
        Command::Export { internal_id } => {
            let document = service.get_document(&internal_id).await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Orphans => {
            for hash in service.find_orphaned_pdfs().await? {
                println!("{}", hash);
            }
            Ok(())
        }
    }
}

async fn upload(
    service: &LogbookService,
    pdf: PathBuf,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let filename = pdf
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Not a file name: {}", pdf.display()))?
        .to_string();

    let data = tokio::fs::read(&pdf)
        .await
        .with_context(|| format!("Failed to read {}", pdf.display()))?;

    let outcome = service
        .create_entry(NewUpload {
            filename: &filename,
            data: &data,
            start_date: start.unwrap_or_else(|| Local::now().date_naive()),
            end_date: end,
        })
        .await?;

    match outcome {
        CreateOutcome::Created { internal_id, entry } => {
            println!(
                "'{}' stored as {} ({} pages, {} weeks, {} to {})",
                entry.id,
                internal_id,
                entry.total_pages,
                entry.weeks.len(),
                entry.timeframe.start_date,
                entry.timeframe.end_date
            );
        }
        CreateOutcome::AlreadyExists(id) => {
            println!("'{}' is already stored; nothing was changed", id);
        }
    }

    Ok(())
}

fn print_entry(entry: &LogbookEntry, only_week: Option<u32>) -> Result<()> {
    println!(
        "{}  ({} pages, {} to {})",
        entry.id, entry.total_pages, entry.timeframe.start_date, entry.timeframe.end_date
    );

    match only_week {
        Some(number) => {
            let week = (number as usize)
                .checked_sub(1)
                .and_then(|index| entry.weeks.get(index))
                .ok_or(AppError::WeekOutOfRange {
                    week: number as usize,
                    total: entry.weeks.len(),
                })?;
            print_week(week);
        }
        None => entry.weeks.iter().for_each(print_week),
    }

    Ok(())
}

fn print_week(week: &Week) {
    println!();
    println!(
        "Week {}  {} to {}",
        week.week_number, week.start_date, week.end_date
    );
    println!("  Goal: {}", week.weekly_goal);
    for (weekday, day) in &week.days {
        println!("  {:<9} {}  {}", weekday.name(), day.date, day.text);
    }
}

/// User-facing message, by failure kind
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>().map(AppError::kind) {
        Some(ErrorKind::NotFound) => format!("{} (check the id with `logbook list`)", err),
        Some(ErrorKind::Validation) => format!("document rejected: {}", err),
        Some(ErrorKind::Store) => format!("storage failure: {:#}", err),
        Some(ErrorKind::Render) => format!("could not render the PDF: {}", err),
        Some(ErrorKind::Input) | None => format!("{:#}", err),
    }
}
