use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polarbench::component::Layout;
use polarbench::settings::{self, Settings};
use polarbench::{batch, bench, output, snapshot, validator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polarbench=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = settings::load_config()?;
    println!("{}", settings);

    if let Some(path) = &settings.replay {
        return replay(path, &settings);
    }
    let Some(path) = &settings.layout else {
        bail!("nothing to do: pass --layout <file> or --replay <file>");
    };
    run(path, &settings)
}

fn run(path: &str, settings: &Settings) -> Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("reading layout {}", path))?;
    let layout: Layout =
        serde_json::from_str(&json).with_context(|| format!("parsing layout {}", path))?;

    let result = bench::trace(&layout, &settings.tolerances)?;
    println!("{}", result);

    if !settings.tolerances.force_mueller {
        let agreement = validator::cross_validate(&layout, &settings.tolerances)?;
        if agreement.agrees {
            info!(max_difference = agreement.max_difference, "Jones and Mueller paths agree");
        } else {
            warn!(
                max_difference = agreement.max_difference,
                sensor = ?agreement.worst_sensor,
                "Jones and Mueller paths disagree"
            );
        }
    }

    let out = Path::new(&settings.output_dir);
    output::write_trace(out, &result)?;
    fs::write(out.join("settings.toml"), toml::to_string(settings)?)?;
    info!("trace written to {:?}", out);

    if let Some(format) = settings.export {
        let written = output::export_bench(out, &layout, &result, format)?;
        info!(files = written.len(), "exported operators and sensor readings");
    }

    if let Some(record) = &settings.record {
        let snapshot = snapshot::export_snapshot(
            &layout,
            &settings.tolerances,
            &result,
            settings.description.as_deref(),
        )?;
        fs::write(record, snapshot.to_json()?)?;
        info!(
            id = %snapshot.id,
            fingerprint = %snapshot.fingerprint,
            "snapshot recorded to {}",
            record
        );
    }

    Ok(())
}

fn replay(path: &str, settings: &Settings) -> Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("reading snapshots {}", path))?;
    let snapshots = snapshot::parse_snapshots(&json)?;

    let report = batch::replay_all(&snapshots, settings.progress);
    print!("{}", report);

    if !report.all_exact() {
        bail!(
            "{} of {} snapshots did not replay exactly",
            report.entries.len() - report.exact(),
            report.entries.len()
        );
    }
    Ok(())
}
