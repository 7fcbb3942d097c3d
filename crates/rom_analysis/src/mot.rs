//! Angle time-series file (`.mot`).
//!
//! Fixed text header terminated by `endheader`, then a tab-separated
//! `time<TAB>angle...` header row and one row per frame. Missing values are
//! written as `NaN`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use contracts::{ContractError, TimeSeries};
use tracing::debug;

const UNITS_NOTE: &str = "Units are S.I. units (second, meters, Newtons, ...)";
const DEGREES_NOTE: &str = "If the header above contains a line with 'inDegrees', this indicates whether rotational values are in degrees (yes) or radians (no).";

/// Write `series` in `.mot` format
pub fn write_mot<W: Write>(series: &TimeSeries, mut writer: W) -> Result<(), ContractError> {
    writeln!(writer, "Coordinates")?;
    writeln!(writer, "version=1")?;
    writeln!(writer, "nRows={}", series.len())?;
    writeln!(writer, "nColumns={}", series.angle_names().len() + 1)?;
    writeln!(writer, "inDegrees=yes")?;
    writeln!(writer)?;
    writeln!(writer, "{UNITS_NOTE}")?;
    writeln!(writer, "{DEGREES_NOTE}")?;
    writeln!(writer)?;
    writeln!(writer, "endheader")?;

    write!(writer, "time")?;
    for name in series.angle_names() {
        write!(writer, "\t{name}")?;
    }
    writeln!(writer)?;

    for row in series.rows() {
        write!(writer, "{}", row.time)?;
        for value in &row.values {
            match value {
                Some(v) => write!(writer, "\t{v}")?,
                None => write!(writer, "\tNaN")?,
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `series` to `path`, replacing any existing file
pub fn write_mot_file(series: &TimeSeries, path: impl AsRef<Path>) -> Result<(), ContractError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_mot(series, BufWriter::new(file))?;
    debug!(path = %path.display(), rows = series.len(), "wrote angle file");
    Ok(())
}

/// Parse a `.mot` stream; `source` names it in error messages
///
/// # Errors
/// `MalformedTimeSeriesFile` when no `time` header row exists, a row has
/// the wrong field count, a number does not parse, or time does not
/// strictly increase.
pub fn read_mot<R: BufRead>(reader: R, source: &str) -> Result<TimeSeries, ContractError> {
    let mut lines = reader.lines().enumerate();

    let mut series = None;
    for (idx, line) in lines.by_ref() {
        let line = line?;
        if line.starts_with("time") {
            let columns: Vec<String> = line
                .trim_end()
                .split('\t')
                .skip(1)
                .map(|c| c.trim().to_string())
                .collect();
            debug!(source, line = idx + 1, columns = columns.len(), "found time header");
            series = Some(TimeSeries::new(columns));
            break;
        }
    }
    let mut series = series
        .ok_or_else(|| ContractError::malformed_file(source, 0, "no header row starting with 'time'"))?;
    let width = series.angle_names().len() + 1;

    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != width {
            return Err(ContractError::malformed_file(
                source,
                line_no,
                format!("expected {width} fields, found {}", fields.len()),
            ));
        }

        let time = parse_field(fields[0])
            .map_err(|msg| ContractError::malformed_file(source, line_no, msg))?
            .ok_or_else(|| ContractError::malformed_file(source, line_no, "undefined time value"))?;
        let values = fields[1..]
            .iter()
            .map(|f| parse_field(f))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|msg| ContractError::malformed_file(source, line_no, msg))?;

        series.push_row(time, values).map_err(|err| match err {
            ContractError::InvalidTimeSeries { message } => {
                ContractError::malformed_file(source, line_no, message)
            }
            other => other,
        })?;
    }

    Ok(series)
}

/// Read a `.mot` file from disk
pub fn read_mot_file(path: impl AsRef<Path>) -> Result<TimeSeries, ContractError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_mot(BufReader::new(file), &path.display().to_string())
}

/// `nan`, `NaN` and empty fields are undefined
fn parse_field(field: &str) -> Result<Option<f64>, String> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(format!("cannot parse '{field}' as a number")),
    }
}
