//! Parquet readers and writers for observations and chart datasets

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::band::{BandSet, Observation};

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
}

/// Observation table schema written by the upstream fetcher
pub fn observation_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("close", DataType::Float64, false),
        Field::new("eps", DataType::Float64, true),
        Field::new("bps", DataType::Float64, true),
    ])
}

/// Long-format chart dataset schema
pub fn chart_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("series", DataType::Utf8, false),
        Field::new("value", DataType::Float64, false),
    ])
}

fn writer_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn write_batch(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_props()))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Run `write` against a temp file beside `path`, then rename over it
///
/// Readers see either the previous file or the complete new one.
pub(crate) fn replace_atomically(
    path: &Path,
    write: impl FnOnce(&Path) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid output path: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write observations in the upstream table format
pub fn write_observations(path: &Path, observations: &[Observation]) -> anyhow::Result<()> {
    let optional = |v: f64| if v.is_finite() { Some(v) } else { None };

    let dates: Vec<i32> = observations.iter().map(|o| date_to_days(o.date)).collect();
    let closes: Vec<f64> = observations.iter().map(|o| o.close).collect();
    let eps: Vec<Option<f64>> = observations.iter().map(|o| optional(o.eps)).collect();
    let bps: Vec<Option<f64>> = observations.iter().map(|o| optional(o.bps)).collect();

    let batch = RecordBatch::try_new(
        Arc::new(observation_schema()),
        vec![
            Arc::new(Date32Array::from(dates)) as ArrayRef,
            Arc::new(Float64Array::from(closes)) as ArrayRef,
            Arc::new(Float64Array::from(eps)) as ArrayRef,
            Arc::new(Float64Array::from(bps)) as ArrayRef,
        ],
    )?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_batch(path, &batch)?;

    tracing::debug!(path = ?path, count = observations.len(), "Wrote observations to Parquet");
    Ok(())
}

/// Reader for upstream observation tables
pub struct ObservationReader {
    path: PathBuf,
}

impl ObservationReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read all observations in file order; nulls become NaN
    pub fn read(&self) -> anyhow::Result<Vec<Observation>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut observations = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;

            let dates = column::<Date32Array>(&batch, "date")?;
            let closes = column::<Float64Array>(&batch, "close")?;
            let eps = column::<Float64Array>(&batch, "eps")?;
            let bps = column::<Float64Array>(&batch, "bps")?;

            let value = |col: &Float64Array, i: usize| {
                if col.is_null(i) {
                    f64::NAN
                } else {
                    col.value(i)
                }
            };

            for i in 0..batch.num_rows() {
                if dates.is_null(i) {
                    anyhow::bail!("Null date in row {}", observations.len());
                }
                let date = days_to_date(dates.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid date in row {}", observations.len()))?;

                observations.push(Observation::new(
                    date,
                    value(closes, i),
                    value(eps, i),
                    value(bps, i),
                ));
            }
        }

        tracing::debug!(path = ?self.path, count = observations.len(), "Read observations");
        Ok(observations)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
}

/// One row of a chart dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    pub date: NaiveDate,
    pub series: String,
    pub value: f64,
}

/// Name of the unsmoothed price series in chart datasets
pub const CLOSE_SERIES: &str = "close";

/// Flatten a band set into `(date, series, value)` rows, close first
pub fn chart_rows(set: &BandSet) -> Vec<ChartRow> {
    let close = set.close.iter().map(|p| ChartRow {
        date: p.date,
        series: CLOSE_SERIES.to_string(),
        value: p.value,
    });
    let bands = set.bands.iter().flat_map(|b| {
        b.points.iter().map(move |p| ChartRow {
            date: p.date,
            series: b.name.clone(),
            value: p.value,
        })
    });

    close.chain(bands).collect()
}

/// Write a band set as a long-format chart dataset, replacing any previous one
pub fn write_chart(path: &Path, set: &BandSet) -> anyhow::Result<usize> {
    let rows = chart_rows(set);

    let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
    let series: Vec<&str> = rows.iter().map(|r| r.series.as_str()).collect();
    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();

    let batch = RecordBatch::try_new(
        Arc::new(chart_schema()),
        vec![
            Arc::new(Date32Array::from(dates)) as ArrayRef,
            Arc::new(StringArray::from(series)) as ArrayRef,
            Arc::new(Float64Array::from(values)) as ArrayRef,
        ],
    )?;

    replace_atomically(path, |tmp| write_batch(tmp, &batch))?;

    tracing::debug!(path = ?path, count = rows.len(), "Wrote chart dataset to Parquet");
    Ok(rows.len())
}

/// Read a chart dataset back into rows
pub fn read_chart(path: &Path) -> anyhow::Result<Vec<ChartRow>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let dates = column::<Date32Array>(&batch, "date")?;
        let series = column::<StringArray>(&batch, "series")?;
        let values = column::<Float64Array>(&batch, "value")?;

        for i in 0..batch.num_rows() {
            let date = days_to_date(dates.value(i))
                .ok_or_else(|| anyhow::anyhow!("Invalid date in row {}", rows.len()))?;
            rows.push(ChartRow {
                date,
                series: series.value(i).to_string(),
                value: values.value(i),
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::{BandLine, Metric, SeriesPoint};
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_date_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        assert_eq!(days_to_date(1), NaiveDate::from_ymd_opt(1970, 1, 2));
        assert_eq!(days_to_date(date_to_days(day(14))), Some(day(14)));
    }

    #[test]
    fn test_observation_schema() {
        let schema = observation_schema();
        assert_eq!(schema.fields().len(), 4);
        assert!(!schema.field_with_name("close").unwrap().is_nullable());
        assert!(schema.field_with_name("eps").unwrap().is_nullable());
    }

    #[test]
    fn test_observations_preserve_missing_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("005930.parquet");

        let observations = vec![
            Observation::new(day(3), 55_000.0, 4_950.0, 52_000.0),
            Observation::new(day(4), 55_500.0, f64::NAN, 52_000.0),
        ];
        write_observations(&path, &observations).unwrap();

        let read = ObservationReader::new(path.clone()).read().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], observations[0]);
        assert_eq!(read[1].date, day(4));
        assert!(read[1].eps.is_nan());
        assert_eq!(read[1].bps, 52_000.0);
    }

    #[test]
    fn test_read_missing_file() {
        let reader = ObservationReader::new(PathBuf::from("/nonexistent/000660.parquet"));
        assert!(reader.read().is_err());
    }

    #[test]
    fn test_read_rejects_wrong_schema() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chart.parquet");
        let set = BandSet {
            ticker: "005930".to_string(),
            metric: Metric::Per,
            close: vec![SeriesPoint::new(day(3), 1.0)],
            bands: vec![],
        };
        write_chart(&path, &set).unwrap();

        let err = ObservationReader::new(path).read().unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn test_chart_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("samsung_per_band.parquet");

        let set = BandSet {
            ticker: "005930".to_string(),
            metric: Metric::Per,
            close: vec![
                SeriesPoint::new(day(3), 55_000.0),
                SeriesPoint::new(day(4), 56_000.0),
            ],
            bands: vec![BandLine {
                name: "PER 10x".to_string(),
                label: "PER 10.0x (10x)".to_string(),
                metric: Metric::Per,
                multiple: 10.0,
                quantile: None,
                color: "#FFB347".to_string(),
                points: vec![SeriesPoint::new(day(4), 49_500.0)],
            }],
        };

        let written = write_chart(&path, &set).unwrap();
        assert_eq!(written, 3);

        let rows = read_chart(&path).unwrap();
        assert_eq!(rows, chart_rows(&set));
        assert_eq!(rows[0].series, CLOSE_SERIES);
        assert_eq!(rows[2].series, "PER 10x");
        assert_eq!(rows[2].value, 49_500.0);

        // no temp file left behind
        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_replace_atomically_keeps_previous_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hynix_pbr_band.json");
        fs::write(&path, b"previous").unwrap();

        let result = replace_atomically(&path, |tmp| {
            fs::write(tmp, b"partial")?;
            anyhow::bail!("render failed")
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
