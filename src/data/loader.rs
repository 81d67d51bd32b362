use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use serde_json::{Map, Value as JsonValue};

use super::model::{
    Catalog, ObservationLog, ObservationRecord, ParameterKind, ParameterRecord, ParameterTable,
    ParameterValue, ReferenceId, SpectralOrder,
};
use crate::config::OracleConfig;

const OBS_COLUMNS: [&str; 5] = ["Filename", "Object", "Order", "WaveMin", "WaveMax"];
const PARAM_COLUMNS: [&str; 4] = ["object", "value", "reference_id", "preferred_flag"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the observation log and both parameter tables named by `config`.
pub fn load_catalog(config: &OracleConfig) -> Result<Catalog> {
    let observations = load_observation_log(&config.observation_log_path())?;
    let reddening = load_parameter_table(ParameterKind::Reddening, &config.reddening_path())?;
    let spectral_types =
        load_parameter_table(ParameterKind::SpectralType, &config.spectral_type_path())?;

    log::info!(
        "Loaded {} observations, {} {} rows, {} {} rows",
        observations.len(),
        reddening.len(),
        ParameterKind::Reddening,
        spectral_types.len(),
        ParameterKind::SpectralType
    );

    Ok(Catalog {
        observations,
        reddening,
        spectral_types,
    })
}

/// Load an observation log. Dispatch by extension (`.csv` or `.json`).
pub fn load_observation_log(path: &Path) -> Result<ObservationLog> {
    let file = open(path)?;
    let loaded = match extension(path).as_str() {
        "csv" => read_observation_log_csv(file),
        "json" => read_observation_log_json(file),
        other => bail!("Unsupported file extension: .{other}"),
    };
    loaded.with_context(|| format!("loading observation log {}", path.display()))
}

/// Load one parameter table. Dispatch by extension (`.csv` or `.json`).
pub fn load_parameter_table(kind: ParameterKind, path: &Path) -> Result<ParameterTable> {
    let file = open(path)?;
    let table = match extension(path).as_str() {
        "csv" => read_parameter_table_csv(kind, file),
        "json" => read_parameter_table_json(kind, file),
        other => bail!("Unsupported file extension: .{other}"),
    };
    table.with_context(|| format!("loading {kind} table {}", path.display()))
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Header row required; columns are located by name (case-insensitive) and
/// any extra columns are ignored.
pub fn read_observation_log_csv<R: Read>(reader: R) -> Result<ObservationLog> {
    let mut reader = csv::Reader::from_reader(reader);
    let idx = column_indices(reader.headers().context("reading CSV headers")?, &OBS_COLUMNS)?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |i: usize| record.get(idx[i]).unwrap_or("").trim();

        records.push(ObservationRecord {
            filename: cell(0).to_string(),
            object: cell(1).to_string(),
            order: SpectralOrder::parse(cell(2)),
            wave_min: parse_wave(cell(3), row_no, OBS_COLUMNS[3])?,
            wave_max: parse_wave(cell(4), row_no, OBS_COLUMNS[4])?,
        });
    }

    ObservationLog::new(records)
}

pub fn read_parameter_table_csv<R: Read>(kind: ParameterKind, reader: R) -> Result<ParameterTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let idx = column_indices(reader.headers().context("reading CSV headers")?, &PARAM_COLUMNS)?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |i: usize| record.get(idx[i]).unwrap_or("").trim();

        records.push(ParameterRecord {
            object: cell(0).to_string(),
            value: parse_value(cell(1)),
            reference: ReferenceId::new(cell(2)),
            preferred: parse_flag(cell(3), row_no)?,
        });
    }

    Ok(ParameterTable::new(kind, records))
}

fn column_indices<const N: usize>(headers: &StringRecord, names: &[&str; N]) -> Result<[usize; N]> {
    let mut idx = [0usize; N];
    for (slot, name) in idx.iter_mut().zip(names) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .with_context(|| format!("CSV missing '{name}' column"))?;
    }
    Ok(idx)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the same keys as the CSV headers:
///
/// ```json
/// [
///   { "Filename": "HD170740_w346_blue_20140916_O12.fits", "Object": "HD 170740",
///     "Order": "O12", "WaveMin": 3302.1, "WaveMax": 3358.7 },
///   ...
/// ]
/// ```
pub fn read_observation_log_json<R: Read>(reader: R) -> Result<ObservationLog> {
    let rows = json_rows(reader)?;
    let mut records = Vec::with_capacity(rows.len());

    for (i, obj) in rows.iter().enumerate() {
        let text = |key: &str| json_text(obj, key, i);
        let number = |key: &str| -> Result<f64> {
            obj.get(key)
                .and_then(JsonValue::as_f64)
                .with_context(|| format!("Row {i}: missing or non-numeric '{key}'"))
        };

        records.push(ObservationRecord {
            filename: text(OBS_COLUMNS[0])?,
            object: text(OBS_COLUMNS[1])?,
            order: SpectralOrder::parse(&text(OBS_COLUMNS[2])?),
            wave_min: number(OBS_COLUMNS[3])?,
            wave_max: number(OBS_COLUMNS[4])?,
        });
    }

    ObservationLog::new(records)
}

pub fn read_parameter_table_json<R: Read>(
    kind: ParameterKind,
    reader: R,
) -> Result<ParameterTable> {
    let rows = json_rows(reader)?;
    let mut records = Vec::with_capacity(rows.len());

    for (i, obj) in rows.iter().enumerate() {
        let value = match obj.get(PARAM_COLUMNS[1]) {
            Some(JsonValue::Number(n)) => ParameterValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Some(JsonValue::String(s)) => parse_value(s),
            Some(JsonValue::Null) | None => ParameterValue::Number(f64::NAN),
            Some(other) => bail!("Row {i}: unsupported value {other}"),
        };
        let preferred = match obj.get(PARAM_COLUMNS[3]) {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(JsonValue::String(s)) => parse_flag(s, i)?,
            Some(JsonValue::Null) | None => false,
            Some(other) => bail!("Row {i}: unsupported preferred flag {other}"),
        };

        records.push(ParameterRecord {
            object: json_text(obj, PARAM_COLUMNS[0], i)?,
            value,
            reference: ReferenceId::new(&json_text(obj, PARAM_COLUMNS[2], i)?),
            preferred,
        });
    }

    Ok(ParameterTable::new(kind, records))
}

fn json_rows<R: Read>(reader: R) -> Result<Vec<Map<String, JsonValue>>> {
    let root: JsonValue = serde_json::from_reader(reader).context("parsing JSON")?;
    let rows = match root {
        JsonValue::Array(rows) => rows,
        _ => bail!("Expected top-level JSON array"),
    };
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            JsonValue::Object(obj) => Ok(obj),
            _ => bail!("Row {i} is not a JSON object"),
        })
        .collect()
}

/// A string or number cell rendered as text.
fn json_text(obj: &Map<String, JsonValue>, key: &str, row: usize) -> Result<String> {
    match obj.get(key) {
        Some(JsonValue::String(s)) => Ok(s.trim().to_string()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        _ => bail!("Row {row}: missing or invalid '{key}'"),
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

fn parse_wave(s: &str, row: usize, col: &str) -> Result<f64> {
    s.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

/// Blank cells become NaN, which fails every equality and bound test.
fn parse_value(s: &str) -> ParameterValue {
    if s.trim().is_empty() {
        return ParameterValue::Number(f64::NAN);
    }
    ParameterValue::parse(s)
}

fn parse_flag(s: &str, row: usize) -> Result<bool> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(false);
    }
    if s.eq_ignore_ascii_case("true") {
        return Ok(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Ok(false);
    }
    match s.parse::<f64>() {
        Ok(v) => Ok(v != 0.0),
        Err(_) => bail!("Row {row}: '{s}' is not a preferred flag"),
    }
}
