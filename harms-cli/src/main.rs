use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use clap::Parser;
use harms_core::{
    AggregateSnapshot, Clock, EncounterRecords, FixedClock, IndicatorResult, IndicatorValue,
    Measure, MobilityEntry, SystemClock,
};
use harms_engine::{EngineConfig, InMemoryRepository, SnapshotBuilder};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "harms-cli",
    about = "Resolve ICU harm evidence indicators from encounter record bundles."
)]
struct Args {
    /// Path to a JSON bundle: one encounter or an array of encounters.
    #[arg(short, long)]
    input: PathBuf,

    /// JSON engine configuration. Missing fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only resolve this encounter.
    #[arg(short, long)]
    encounter: Option<String>,

    /// Evaluation instant (RFC 3339). Defaults to the wall clock.
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Offset of the unit's local time, used for the midnight boundary.
    #[arg(long, default_value = "+00:00", value_parser = parse_offset)]
    utc_offset: FixedOffset,

    /// Print full snapshots as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Bundle {
    Many(Vec<EncounterRecords>),
    One(EncounterRecords),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("harms_engine=info".parse()?)
                .add_directive("harms_cli=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    let encounters = load_bundle(&args.input)?;
    let mut ids: Vec<String> = encounters
        .iter()
        .map(|records| records.encounter_id.clone())
        .collect();
    if let Some(wanted) = &args.encounter {
        if !ids.contains(wanted) {
            bail!("encounter {wanted} is not in {:?}", args.input);
        }
        ids = vec![wanted.clone()];
    }

    let repository: InMemoryRepository = encounters.into_iter().collect();
    let builder =
        SnapshotBuilder::new(repository, config).context("invalid engine configuration")?;

    let snapshots = match args.now {
        Some(now) => run(&builder, &ids, &FixedClock::new(now, args.utc_offset)),
        None => run(&builder, &ids, &SystemClock::new(args.utc_offset)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for snapshot in &snapshots {
            print_summary(snapshot);
        }
    }

    if snapshots.len() < ids.len() {
        bail!("{} of {} encounters failed", ids.len() - snapshots.len(), ids.len());
    }
    Ok(())
}

/// Builds a snapshot per encounter. A failing encounter is logged and skipped.
fn run<C: Clock>(
    builder: &SnapshotBuilder<InMemoryRepository>,
    ids: &[String],
    clock: &C,
) -> Vec<AggregateSnapshot> {
    ids.iter()
        .filter_map(|id| match builder.build_snapshot(id, clock) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::error!(encounter_id = %id, error = %err, "snapshot failed");
                None
            }
        })
        .collect()
}

fn load_bundle(path: &Path) -> anyhow::Result<Vec<EncounterRecords>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read bundle {path:?}"))?;
    let bundle: Bundle = serde_json::from_str(&data)
        .with_context(|| format!("{path:?} is not an encounter bundle"))?;
    Ok(match bundle {
        Bundle::Many(encounters) => encounters,
        Bundle::One(records) => vec![records],
    })
}

fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("{path:?} is not an engine config"))
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
fn parse_offset(value: &str) -> Result<FixedOffset, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    value
        .parse::<FixedOffset>()
        .map_err(|err| format!("expected an offset like +05:30, got {value:?}: {err}"))
}

fn print_summary(snapshot: &AggregateSnapshot) {
    println!(
        "Encounter: {}\nGenerated at: {}\nDocumented: {}/{}",
        snapshot.encounter_id,
        snapshot.generated_at,
        snapshot.documented_count(),
        snapshot.indicators.len()
    );
    for (indicator, result) in &snapshot.indicators {
        println!("  {:<32} {}", indicator.as_str(), describe(result));
    }
}

fn describe(result: &IndicatorResult) -> String {
    let value = match &result.value {
        IndicatorValue::Documented(Measure::Score(score)) => score.to_string(),
        IndicatorValue::Documented(Measure::Flag(true)) => "yes".to_string(),
        IndicatorValue::Documented(Measure::Flag(false)) => "no".to_string(),
        IndicatorValue::Documented(Measure::Anticoagulation(class)) => format!("{class:?}"),
        IndicatorValue::Documented(Measure::Mobility(entries)) => describe_mobility(entries),
        IndicatorValue::NotDocumented => return "not documented".to_string(),
        IndicatorValue::NotApplicable(reason) => {
            return format!("not applicable ({reason:?})");
        }
    };
    match result.recorded_at {
        Some(at) => format!("{value} @ {at}"),
        None => value,
    }
}

fn describe_mobility(entries: &[MobilityEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let extras: Vec<&str> = [&entry.assist_device, &entry.assist_count]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            if extras.is_empty() {
                format!("{} {}", entry.clinician.tag(), entry.level)
            } else {
                format!("{} {} ({})", entry.clinician.tag(), entry.level, extras.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
