use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analyzer::{self, AnalyzerSweep};
use crate::component::Layout;
use crate::element::Element;
use crate::jones::JonesMatrix;
use crate::mueller::{self, MuellerMatrix};
use crate::result::TraceResult;
use crate::segment::SegmentEnd;
use crate::state::PolarizationState;
use crate::stokes::StokesVector;


/// File format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Comment lines written above the CSV header.
fn metadata_header(metadata: &[(String, String)]) -> String {
    if metadata.is_empty() {
        return String::new();
    }
    let mut header = format!(
        "# Exported from polarbench {}\n# Timestamp: {}\n",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().to_rfc3339()
    );
    for (key, value) in metadata {
        header.push_str(&format!("# {}: {}\n", key, value));
    }
    header.push_str("#\n");
    header
}

/// CSV with optional metadata comments and a header row.
pub fn csv_table(headers: &[&str], rows: &[Vec<f64>], metadata: &[(String, String)]) -> String {
    let mut out = metadata_header(metadata);
    out.push_str(&headers.iter().join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().join(","));
        out.push('\n');
    }
    out
}

fn wrap_json(data: serde_json::Value, metadata: &[(String, String)]) -> serde_json::Value {
    let mut meta = serde_json::Map::new();
    meta.insert("source".into(), json!("polarbench"));
    meta.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
    for (key, value) in metadata {
        meta.insert(key.clone(), json!(value));
    }
    json!({ "metadata": meta, "data": data })
}

/// Adds the matrix name and shape to non-empty metadata.
fn matrix_metadata(
    metadata: &[(String, String)],
    name: &str,
    shape: &str,
) -> Vec<(String, String)> {
    let mut metadata = metadata.to_vec();
    if !metadata.is_empty() {
        metadata.push(("Matrix".into(), name.into()));
        metadata.push(("Shape".into(), shape.into()));
    }
    metadata
}

/// One line per element: `row,col,re,im`.
pub fn jones_csv(m: &JonesMatrix, name: &str, metadata: &[(String, String)]) -> String {
    let metadata = matrix_metadata(metadata, name, "2x2");
    let rows = (0..2)
        .cartesian_product(0..2)
        .map(|(i, j)| vec![i as f64, j as f64, m[(i, j)].re, m[(i, j)].im])
        .collect_vec();
    csv_table(&["row", "col", "re", "im"], &rows, &metadata)
}

pub fn jones_json(m: &JonesMatrix, name: &str, metadata: &[(String, String)]) -> serde_json::Value {
    let values = (0..2)
        .map(|i| {
            (0..2)
                .map(|j| json!({ "re": m[(i, j)].re, "im": m[(i, j)].im }))
                .collect_vec()
        })
        .collect_vec();
    wrap_json(
        json!({ "matrixName": name, "shape": [2, 2], "values": values }),
        metadata,
    )
}

/// Four rows of four values, row-major.
pub fn mueller_csv(m: &MuellerMatrix, name: &str, metadata: &[(String, String)]) -> String {
    let mut out = metadata_header(&matrix_metadata(metadata, name, "4x4"));
    for i in 0..4 {
        out.push_str(&(0..4).map(|j| m.get(i, j)).join(","));
        out.push('\n');
    }
    out
}

pub fn mueller_json(
    m: &MuellerMatrix,
    name: &str,
    metadata: &[(String, String)],
) -> serde_json::Value {
    let values = (0..4)
        .map(|i| (0..4).map(|j| m.get(i, j)).collect_vec())
        .collect_vec();
    wrap_json(
        json!({ "matrixName": name, "shape": [4, 4], "values": values }),
        metadata,
    )
}

fn stokes_parameters(s: &StokesVector) -> [(&'static str, f64); 5] {
    let docp = if s.s0 < crate::config::ZERO_INTENSITY {
        0.0
    } else {
        (s.s3.abs() / s.s0).min(1.0)
    };
    [
        ("DOP", s.degree_of_polarization()),
        ("DOLP", s.degree_of_linear_polarization()),
        ("DOCP", docp),
        ("orientation_angle_deg", s.orientation()),
        ("ellipticity_angle_deg", s.ellipticity_angle()),
    ]
}

pub fn stokes_json(s: &StokesVector, metadata: &[(String, String)]) -> serde_json::Value {
    let parameters: serde_json::Map<_, _> = stokes_parameters(s)
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    wrap_json(
        json!({
            "stokesVector": { "S0": s.s0, "S1": s.s1, "S2": s.s2, "S3": s.s3 },
            "polarizationParameters": parameters,
        }),
        metadata,
    )
}

/// `Parameter,Value` table of the components and derived parameters.
pub fn stokes_csv(s: &StokesVector, metadata: &[(String, String)]) -> String {
    let mut out = metadata_header(metadata);
    out.push_str("Parameter,Value\n");
    let components = [("S0", s.s0), ("S1", s.s1), ("S2", s.s2), ("S3", s.s3)];
    for (name, value) in components.iter().chain(stokes_parameters(s).iter()) {
        out.push_str(&format!("{},{}\n", name, value));
    }
    out
}

pub fn sweep_csv(sweep: &AnalyzerSweep, metadata: &[(String, String)]) -> String {
    let rows = sweep
        .angles
        .iter()
        .zip(&sweep.intensities)
        .map(|(a, i)| vec![*a, *i])
        .collect_vec();
    csv_table(&["angle_deg", "intensity"], &rows, metadata)
}

pub fn sweep_json(sweep: &AnalyzerSweep, metadata: &[(String, String)]) -> serde_json::Value {
    wrap_json(
        json!({
            "angles": sweep.angles,
            "intensities": sweep.intensities,
            "extinctionRatio": sweep.extinction_ratio(),
        }),
        metadata,
    )
}

/// Number of analyser angles in an exported sweep, 0 to 180 degrees.
const SWEEP_STEPS: usize = 181;

fn render(
    format: ExportFormat,
    csv: impl FnOnce() -> String,
    json: impl FnOnce() -> serde_json::Value,
) -> Result<String> {
    Ok(match format {
        ExportFormat::Csv => csv(),
        ExportFormat::Json => serde_json::to_string_pretty(&json())?,
    })
}

/// Exports the operator of every single-output component and the reading of
/// every sensor into `dir`. A component's Jones matrix is written only when
/// none of its elements depolarizes. Returns the written paths.
pub fn export_bench(
    dir: &Path,
    layout: &Layout,
    result: &TraceResult,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for node in &layout.components {
        let elements = node.kind.elements();
        if elements.is_empty() {
            continue;
        }
        let metadata = vec![
            ("Component".to_string(), node.id.clone()),
            ("Type".to_string(), node.kind.name().to_string()),
        ];

        let operators = elements.iter().map(Element::mueller).collect_vec();
        let m = mueller::chain_mueller(&operators);
        let contents = render(
            format,
            || mueller_csv(&m, "Mueller Matrix", &metadata),
            || mueller_json(&m, "Mueller Matrix", &metadata),
        )?;
        written.push(write_export(dir, &format!("{}_mueller", node.id), format, &contents)?);

        let jones: Option<Vec<JonesMatrix>> = elements.iter().map(Element::jones).collect();
        if let Some(jones) = jones {
            let j = jones.iter().fold(JonesMatrix::identity(), |total, m| m * total);
            let contents = render(
                format,
                || jones_csv(&j, "Jones Matrix", &metadata),
                || jones_json(&j, "Jones Matrix", &metadata),
            )?;
            written.push(write_export(dir, &format!("{}_jones", node.id), format, &contents)?);
        }
    }

    for (id, reading) in &result.sensors {
        let metadata = vec![
            ("Sensor".to_string(), id.clone()),
            ("Matched".to_string(), reading.matched.to_string()),
        ];
        let contents = render(
            format,
            || stokes_csv(&reading.stokes, &metadata),
            || stokes_json(&reading.stokes, &metadata),
        )?;
        written.push(write_export(dir, &format!("{}_stokes", id), format, &contents)?);

        let state = PolarizationState::Stokes(reading.stokes);
        let sweep = analyzer::analyzer_sweep(&state, 0.0, 180.0, SWEEP_STEPS);
        let contents = render(
            format,
            || sweep_csv(&sweep, &metadata),
            || sweep_json(&sweep, &metadata),
        )?;
        written.push(write_export(dir, &format!("{}_sweep", id), format, &contents)?);
    }

    Ok(written)
}

/// Writes `contents` to `dir/name.ext`, creating the directory.
pub fn write_export(
    dir: &Path,
    name: &str,
    format: ExportFormat,
    contents: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", name, format.extension()));
    fs::write(&path, contents)?;
    Ok(path)
}

/// Write the traced segments to a CSV file, one line per segment.
pub fn write_segments(path: &Path, result: &TraceResult) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "index,origin,end,depth,intensity,s0,s1,s2,s3")?;
    for segment in &result.segments {
        let end = match &segment.end {
            SegmentEnd::Node(id) => id.as_str(),
            SegmentEnd::Escaped => "<escaped>",
            SegmentEnd::Extinguished => "<extinguished>",
            SegmentEnd::DepthExceeded => "<depth>",
        };
        let s = segment.state.to_stokes();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            segment.index,
            segment.origin,
            end,
            segment.depth,
            segment.intensity,
            s.s0,
            s.s1,
            s.s2,
            s.s3
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full trace result as JSON.
pub fn write_result_json(path: &Path, result: &TraceResult) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    Ok(())
}

/// Writes `segments.csv` and `result.json` into `dir`.
pub fn write_trace(dir: &Path, result: &TraceResult) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_segments(&dir.join("segments.csv"), result)?;
    write_result_json(&dir.join("result.json"), result)?;
    Ok(())
}
