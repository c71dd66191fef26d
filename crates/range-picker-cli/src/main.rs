use std::fmt::Display;
use std::fs;
use std::io::{self, Read};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, SecondsFormat, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use range_picker::filter::parse_weekday;
use range_picker::{
    catalog, find_preset, select_time_range, Edge, HourPreset, OffsetExpr, PickerConfig,
    PickerValue, RangeSelection, ResolveOptions, Side, TimestampEncoding, WeekStartDay,
    WeekdayGroup,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "range-picker")]
#[command(about = "Resolve offset expressions and script date/time range picks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an offset expression (e.g. "offset:-7days", "startof:month")
    Resolve {
        /// Expression to resolve
        expr: String,

        #[command(flatten)]
        anchor: AnchorArgs,

        /// Resolve as the start or end of a range (matters for /week, /month, /year)
        #[arg(long = "as", value_enum, default_value_t = BoundArg::Start)]
        bound: BoundArg,
    },
    /// List the preset catalog with each range resolved
    Presets {
        #[command(flatten)]
        anchor: AnchorArgs,

        /// Include presets reaching into the future
        #[arg(long)]
        future: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run a scripted picking session and print the committed value as JSON
    Pick {
        #[command(flatten)]
        anchor: AnchorArgs,

        /// Prior value as JSON ("-" reads stdin)
        #[arg(long)]
        prior: Option<String>,

        /// Activate a preset by label (e.g. "Last 7 days")
        #[arg(long)]
        preset: Option<String>,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Weekday filter: comma-separated names, or "all" / "working"
        #[arg(long)]
        days: Option<String>,

        /// Hour filter: HH:MM-HH:MM, or "all-day" / "busy"
        #[arg(long)]
        hours: Option<String>,

        /// Timestamp encoding of the output
        #[arg(long, value_enum, default_value_t = EncodingArg::Iso)]
        encoding: EncodingArg,

        /// How integer timestamps in --prior are read; defaults to --encoding
        #[arg(long, value_enum)]
        prior_encoding: Option<EncodingArg>,

        /// Offer presets reaching into the future
        #[arg(long)]
        future: bool,

        /// Drop weekday and hour filters from the output
        #[arg(long)]
        no_optional: bool,
    },
}

#[derive(clap::Args)]
struct AnchorArgs {
    /// Reference instant (RFC 3339); defaults to the local clock
    #[arg(long)]
    now: Option<String>,

    /// First day of the week
    #[arg(long, value_enum, default_value_t = WeekStartArg::Monday)]
    week_start: WeekStartArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeekStartArg {
    Monday,
    Sunday,
}

impl From<WeekStartArg> for WeekStartDay {
    fn from(arg: WeekStartArg) -> Self {
        match arg {
            WeekStartArg::Monday => WeekStartDay::Monday,
            WeekStartArg::Sunday => WeekStartDay::Sunday,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BoundArg {
    Start,
    End,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Iso,
    Unix,
    UnixMs,
}

impl From<EncodingArg> for TimestampEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Iso => TimestampEncoding::Iso8601,
            EncodingArg::Unix => TimestampEncoding::UnixSeconds,
            EncodingArg::UnixMs => TimestampEncoding::UnixMillis,
        }
    }
}

struct PickArgs {
    prior: Option<String>,
    preset: Option<String>,
    from: Option<String>,
    to: Option<String>,
    days: Option<String>,
    hours: Option<String>,
    encoding: TimestampEncoding,
    config: PickerConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            expr,
            anchor,
            bound,
        } => {
            let parsed: OffsetExpr = expr.parse()?;
            let edge = match bound {
                BoundArg::Start => Edge::Start,
                BoundArg::End => Edge::End,
            };
            let options = ResolveOptions {
                week_start: anchor.week_start.into(),
            };
            let resolved = match parse_now(anchor.now.as_deref())? {
                Some(now) => format_instant(&parsed.resolve_bound(&now, edge, &options)),
                None => format_instant(&parsed.resolve_bound(&Local::now(), edge, &options)),
            };
            println!("{resolved}");
        }
        Commands::Presets {
            anchor,
            future,
            json,
        } => {
            let options = ResolveOptions {
                week_start: anchor.week_start.into(),
            };
            match parse_now(anchor.now.as_deref())? {
                Some(now) => print_presets(&now, future, json, &options)?,
                None => print_presets(&Local::now(), future, json, &options)?,
            }
        }
        Commands::Pick {
            anchor,
            prior,
            preset,
            from,
            to,
            days,
            hours,
            encoding,
            prior_encoding,
            future,
            no_optional,
        } => {
            let args = PickArgs {
                prior,
                preset,
                from,
                to,
                days,
                hours,
                encoding: encoding.into(),
                config: PickerConfig {
                    allow_future_dates: future,
                    optional_features_enabled: !no_optional,
                    week_start: anchor.week_start.into(),
                    prior_encoding: prior_encoding.unwrap_or(encoding).into(),
                    ..PickerConfig::default()
                },
            };
            match parse_now(anchor.now.as_deref())? {
                Some(now) => run_pick(&now, args)?,
                None => run_pick(&Local::now(), args)?,
            }
        }
    }

    Ok(())
}

/// An explicit `--now` keeps its own UTC offset; `None` means the local clock.
fn parse_now(now: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    now.map(|s| {
        DateTime::parse_from_rfc3339(s.trim())
            .with_context(|| format!("invalid --now '{s}', expected RFC 3339"))
    })
    .transpose()
}

fn format_instant<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn print_presets<Tz: TimeZone>(
    now: &DateTime<Tz>,
    future: bool,
    json: bool,
    options: &ResolveOptions,
) -> Result<()>
where
    Tz::Offset: Display,
{
    let presets = catalog(future);

    if json {
        let entries: Vec<serde_json::Value> = presets
            .iter()
            .map(|preset| {
                let range = select_time_range(preset, now, options);
                serde_json::json!({
                    "label": preset.label,
                    "start_expr": preset.start,
                    "end_expr": preset.end,
                    "start": format_instant(&range.start),
                    "end": format_instant(&range.end),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for preset in &presets {
            let range = select_time_range(preset, now, options);
            println!(
                "{:<22} {} .. {}",
                preset.label,
                format_instant(&range.start),
                format_instant(&range.end)
            );
        }
    }

    Ok(())
}

fn run_pick<Tz: TimeZone>(now: &DateTime<Tz>, args: PickArgs) -> Result<()> {
    let prior = args.prior.as_deref().map(read_prior).transpose()?;
    let mut selection = RangeSelection::open(args.config, prior.as_ref(), now);

    if let Some(label) = &args.preset {
        let preset = find_preset(selection.presets(), label)
            .cloned()
            .ok_or_else(|| anyhow!("unknown preset '{label}'"))?;
        selection.select_preset(&preset, now);
    }

    match (&args.from, &args.to) {
        (Some(from), Some(to)) => {
            selection.on_calendar_day_click(parse_day(from)?);
            selection.on_calendar_day_click(parse_day(to)?);
        }
        (Some(from), None) => selection.edit_date_part(Side::Start, from)?,
        (None, Some(to)) => selection.edit_date_part(Side::End, to)?,
        (None, None) => {}
    }

    if let Some(days) = &args.days {
        apply_days(&mut selection, days)?;
    }
    if let Some(hours) = &args.hours {
        apply_hours(&mut selection, hours)?;
    }

    debug!(phase = ?selection.phase(), "scripted session finished");
    let result = selection.submit().context("cannot submit range")?;
    println!("{}", result.to_value(args.encoding).to_json()?);
    Ok(())
}

fn read_prior(source: &str) -> Result<PickerValue> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read prior value from stdin")?;
        buf
    } else {
        fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    PickerValue::from_json(&text).context("invalid prior value")
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn apply_days<Tz: TimeZone>(selection: &mut RangeSelection<Tz>, days: &str) -> Result<()> {
    selection.set_day_subset_enabled(true);
    match days.trim().to_ascii_lowercase().as_str() {
        "all" => selection.set_weekday_group(WeekdayGroup::All),
        "working" => selection.set_weekday_group(WeekdayGroup::WorkingDays),
        _ => {
            selection.set_weekday_group(WeekdayGroup::Custom);
            for name in days.split(',').filter(|name| !name.trim().is_empty()) {
                let day = parse_weekday(name).ok_or_else(|| anyhow!("unknown weekday '{name}'"))?;
                if !selection.weekdays().contains(day) {
                    selection.toggle_weekday(day);
                }
            }
        }
    }
    Ok(())
}

fn apply_hours<Tz: TimeZone>(selection: &mut RangeSelection<Tz>, hours: &str) -> Result<()> {
    match hours.trim() {
        "all-day" => selection.apply_hour_preset(HourPreset::AllDay),
        "busy" => selection.apply_hour_preset(HourPreset::BusyHours),
        window => {
            let (start, end) = window
                .split_once('-')
                .ok_or_else(|| anyhow!("invalid hours '{window}', expected HH:MM-HH:MM"))?;
            let (start_hour, start_minute) = parse_hour_minute(start)?;
            let (end_hour, end_minute) = parse_hour_minute(end)?;
            selection.edit_hour_field(Side::Start, start_hour, start_minute)?;
            selection.edit_hour_field(Side::End, end_hour, end_minute)?;
            selection.set_hour_subset_enabled(true);
        }
    }
    Ok(())
}

fn parse_hour_minute(s: &str) -> Result<(u32, u32)> {
    let Some((hour, minute)) = s.trim().split_once(':') else {
        bail!("invalid time '{s}', expected HH:MM");
    };
    let hour = hour.parse().with_context(|| format!("invalid hour in '{s}'"))?;
    let minute = minute.parse().with_context(|| format!("invalid minute in '{s}'"))?;
    Ok((hour, minute))
}
