use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, info, warn};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use timetable_core::calendar::{calendar_blocks, write_calendar_text};
use timetable_core::schedule::FilteredEntry;
use timetable_core::spreadsheet::write_schedule_xlsx;
use timetable_core::{
    Catalog, DataProvider, Dataset, FileScheduleStore, Schedule, ScheduleFilter, TimetableConfig,
    two_stage_schedule,
};

#[derive(Parser, Debug)]
#[command(name = "timetable", about = "Weekly timetable generator")]
struct Cli {
    /// Repeat for more detail (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a timetable and store it.
    Solve {
        /// Dataset as .json or .xlsx.
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        store: PathBuf,
        /// JSON run configuration; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        slots_per_day: Option<u32>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        start_hour: Option<u32>,
        /// Seconds allowed for each satisfiability check.
        #[arg(long)]
        time_limit: Option<f64>,
        #[arg(long)]
        no_improve: bool,
        #[arg(long)]
        calendar: Option<PathBuf>,
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },
    /// Print a stored timetable, optionally restricted to one view.
    Report {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, conflicts_with_all = ["professor", "course", "room"])]
        programme: Option<u32>,
        #[arg(long, conflicts_with_all = ["course", "room"])]
        professor: Option<u32>,
        #[arg(long, conflicts_with = "room")]
        course: Option<u32>,
        #[arg(long)]
        room: Option<u32>,
        #[arg(long)]
        calendar: Option<PathBuf>,
    },
    /// Write an empty dataset workbook to fill in.
    Template {
        #[arg(long)]
        out: PathBuf,
    },
}

fn load_dataset(path: &Path) -> Result<Catalog> {
    let dataset = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Dataset::from_json_file(path)?,
        Some("xlsx") => Dataset::from_xlsx(path)?,
        _ => bail!("unsupported dataset format: {}", path.display()),
    };
    Catalog::new(dataset).with_context(|| format!("invalid dataset {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<TimetableConfig> {
    match path {
        Some(path) => TimetableConfig::from_json_file(path).context("loading configuration"),
        None => Ok(TimetableConfig::default()),
    }
}

fn write_calendar(
    path: &Path,
    entries: &[FilteredEntry],
    catalog: &Catalog,
    config: &TimetableConfig,
) -> Result<()> {
    let blocks = calendar_blocks(entries, catalog, config)?;
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    write_calendar_text(&blocks, config, &mut out)?;
    info!("wrote {} calendar blocks to {}", blocks.len(), path.display());
    Ok(())
}

fn all_entries(schedule: &Schedule, catalog: &Catalog) -> Result<Vec<FilteredEntry>> {
    schedule
        .entries()
        .iter()
        .map(|e| {
            Ok(FilteredEntry {
                timeslot: e.timeslot,
                course: catalog.course_of(e.session)?,
                room: e.room,
            })
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Solve {
            data,
            store,
            config,
            slots_per_day,
            days,
            start_hour,
            time_limit,
            no_improve,
            calendar,
            xlsx,
        } => {
            let catalog = load_dataset(&data)?;
            let mut config = load_config(config.as_deref())?;
            if let Some(v) = slots_per_day {
                config.slots_per_day = v;
            }
            if let Some(v) = days {
                config.days = v;
            }
            if let Some(v) = start_hour {
                config.start_hour = v;
            }
            if let Some(v) = time_limit {
                config.time_limit_secs = v;
            }
            if no_improve {
                config.improve = false;
            }

            let mut store = FileScheduleStore::new(&store);
            let report = two_stage_schedule(&catalog, &config, &mut store)?;
            info!(
                "{} entries stored in {} ({:?} improvement, {:.2}s)",
                report.schedule.len(),
                store.path().display(),
                report.improvement,
                report.seconds
            );

            let violations = report.schedule.verify(&catalog, &config)?;
            for v in &violations {
                warn!("schedule check: {v:?}");
            }

            if let Some(path) = calendar {
                write_calendar(&path, &all_entries(&report.schedule, &catalog)?, &catalog, &config)?;
            }
            if let Some(path) = xlsx {
                write_schedule_xlsx(&path, &report.schedule, &catalog, &config)?;
                info!("wrote timetable workbook {}", path.display());
            }
            Ok(())
        }
        Command::Report {
            data,
            store,
            config,
            programme,
            professor,
            course,
            room,
            calendar,
        } => {
            let catalog = load_dataset(&data)?;
            let config = load_config(config.as_deref())?;
            let schedule = Schedule::load(&FileScheduleStore::new(&store))?;

            let filter = programme
                .map(ScheduleFilter::Programme)
                .or(professor.map(ScheduleFilter::Professor))
                .or(course.map(ScheduleFilter::Course))
                .or(room.map(ScheduleFilter::Room));
            let entries = match filter {
                Some(filter) => schedule.filtered(&catalog, filter)?,
                None => all_entries(&schedule, &catalog)?,
            };
            for e in &entries {
                println!(
                    "{:>4}  {:<10} {:>2}:00  {:<32} {}",
                    e.timeslot,
                    timetable_core::calendar::day_name(config.day_of(e.timeslot)),
                    config.start_hour + config.slot_in_day(e.timeslot),
                    catalog.course_name(e.course)?,
                    catalog.room_name(e.room)?
                );
            }
            if let Some(path) = calendar {
                write_calendar(&path, &entries, &catalog, &config)?;
            }
            Ok(())
        }
        Command::Template { out } => {
            Dataset::default().write_xlsx(&out)?;
            info!("wrote dataset template {}", out.display());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("initializing logger")?;
    run(cli)
}
