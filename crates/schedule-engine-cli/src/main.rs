use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use schedule_engine::{
    apply_edit, calendar::parse_iso_date, expand_with_config, marked_dates, today_in,
    validate_end_date, EditMode, EndDateInput, EngineConfig, Frequency, MemoryStore,
    RecurrenceRule, ScheduleBook, ScheduleEdit, ScheduleError, ScheduleMaster, ScheduleRecord,
};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Expand recurring schedules, validate end dates, and reconcile occurrence edits"
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the occurrence dates of a recurring schedule
    Expand(SeriesArgs),
    /// Print calendar markers (ISO date -> selected/marked) for a schedule
    Marks(SeriesArgs),
    /// Validate a typed end date and print the exclusive end date to store
    EndDate {
        #[arg(long, allow_hyphen_values = true)]
        year: String,
        #[arg(long, allow_hyphen_values = true)]
        month: String,
        #[arg(long, allow_hyphen_values = true)]
        day: String,
        /// Start date of the series (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Override "today" (YYYY-MM-DD); defaults to the current date in the configured timezone
        #[arg(long)]
        today: Option<String>,
    },
    /// Apply an edit of one occurrence to a master schedule record
    Edit {
        /// Master schedule record (JSON)
        #[arg(long)]
        master: PathBuf,
        /// The occurrence being edited (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long, value_enum)]
        mode: ModeArg,
        /// The edit (JSON)
        #[arg(long)]
        changes: PathBuf,
    },
}

#[derive(Args)]
struct SeriesArgs {
    /// Base date of the schedule (YYYY-MM-DD)
    #[arg(long)]
    start: String,
    /// Repeat frequency; omit for a one-off schedule
    #[arg(long, value_enum)]
    frequency: Option<FrequencyArg>,
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    interval: i32,
    /// Exclusive end date of the series (YYYY-MM-DD)
    #[arg(long)]
    until: Option<String>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    window_end: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum FrequencyArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => Frequency::Daily,
            FrequencyArg::Weekly => Frequency::Weekly,
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Yearly => Frequency::Yearly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Single,
    All,
}

impl From<ModeArg> for EditMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Single => EditMode::Single,
            ModeArg::All => EditMode::RecurringAll,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let output = match cli.command {
        Command::Expand(args) => {
            let (base, rule, window_end) = series(&args)?;
            let dates = match rule {
                Some(rule) => expand_with_config(base, &rule, window_end, &config)?,
                None if base <= window_end => vec![base],
                None => Vec::new(),
            };
            serde_json::to_value(dates)?
        }
        Command::Marks(args) => {
            let (base, rule, window_end) = series(&args)?;
            serde_json::to_value(marked_dates(base, rule.as_ref(), window_end, &config)?)?
        }
        Command::EndDate {
            year,
            month,
            day,
            start,
            today,
        } => {
            let start = start.as_deref().map(parse_iso_date).transpose()?;
            let today = match today {
                Some(today) => parse_iso_date(&today)?,
                None => today_in(Utc::now(), &config.timezone)?,
            };
            let input = EndDateInput::new(year, month, day);
            let end = validate_end_date(&input, start, today, &config).map_err(field_context)?;
            json!({ "end_date": end })
        }
        Command::Edit {
            master,
            date,
            mode,
            changes,
        } => edit(&master, &date, mode.into(), &changes, &config)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn series(args: &SeriesArgs) -> Result<(NaiveDate, Option<RecurrenceRule>, NaiveDate)> {
    let base = parse_iso_date(&args.start)?;
    let window_end = parse_iso_date(&args.window_end)?;
    let rule = match args.frequency {
        Some(frequency) => {
            let rule = RecurrenceRule::new(frequency.into(), args.interval);
            Some(match &args.until {
                Some(until) => rule.until(parse_iso_date(until)?),
                None => rule,
            })
        }
        None => None,
    };
    Ok((base, rule, window_end))
}

fn field_context(err: ScheduleError) -> anyhow::Error {
    match err.field() {
        Some(field) => anyhow::Error::new(err).context(format!("invalid {field}")),
        None => err.into(),
    }
}

fn edit(
    master_path: &Path,
    date: &str,
    mode: EditMode,
    changes_path: &Path,
    config: &EngineConfig,
) -> Result<serde_json::Value> {
    let record: ScheduleRecord = read_json(master_path)?;
    let changes: ScheduleEdit = read_json(changes_path)?;
    let occurrence_date = parse_iso_date(date)?;

    let master = ScheduleMaster::try_from(record)?;
    let master_id = master.id.clone();
    let mut store = MemoryStore::new();
    store.insert(master_id.clone(), ScheduleRecord::from(&master));
    let mut book = ScheduleBook::new();
    book.insert_master(master);

    let applied = apply_edit(
        &mut store,
        &mut book,
        &master_id,
        occurrence_date,
        mode,
        &changes,
        config,
    )?;
    let records: Vec<&ScheduleRecord> = store.records().values().collect();
    Ok(json!({ "applied": applied, "records": records }))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
