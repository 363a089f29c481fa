//! JSON export of pipeline results

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use vegtrend_core::vector::AttributeValue;

use crate::chart::{parcel_label, ChartSeries};
use crate::error::Result;
use crate::pipeline::PipelineOutput;

/// One selected parcel and its series
#[derive(Debug, Clone, Serialize)]
pub struct ParcelRecord {
    pub id: String,
    pub label: String,
    /// Measured distance to the reference parcel
    pub distance: f64,
    pub properties: BTreeMap<String, AttributeValue>,
    pub dates: Vec<NaiveDate>,
    /// `null` where the month had no valid pixel over the parcel
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummary {
    pub year: i32,
    pub images: usize,
    /// Pixels flagged as low vegetation
    pub flagged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthSummary {
    pub property: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub images: usize,
    /// Reflectance images without a cloud-probability counterpart
    pub dropped: usize,
    pub valid_pixels: usize,
}

/// Serializable summary of a run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub reference: String,
    pub parcels: Vec<ParcelRecord>,
    pub baselines: Vec<BaselineSummary>,
    pub months: Vec<MonthSummary>,
    pub chart: ChartSeries,
}

impl PipelineReport {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let parcels = output
            .selection
            .parcels
            .iter()
            .zip(&output.selection.distances)
            .enumerate()
            .map(|(index, (parcel, &distance))| {
                let series = output.series.series(index);
                ParcelRecord {
                    id: parcel.id().to_string(),
                    label: parcel_label(parcel),
                    distance,
                    properties: parcel.properties().clone(),
                    dates: series.map(|s| s.dates.clone()).unwrap_or_default(),
                    values: series.map(|s| s.values.clone()).unwrap_or_default(),
                }
            })
            .collect();

        let baselines = output
            .baselines
            .iter()
            .map(|b| BaselineSummary {
                year: b.year,
                images: b.image_count,
                flagged: b.flagged_count(),
            })
            .collect();

        let months = output
            .composites
            .iter()
            .map(|c| MonthSummary {
                property: c.property_name(),
                start: c.window.start(),
                end: c.window.end(),
                images: c.image_count,
                dropped: c.report.unmatched,
                valid_pixels: c.valid_count(),
            })
            .collect();

        Self {
            reference: output.reference.id().to_string(),
            parcels,
            baselines,
            months,
            chart: output.chart.clone(),
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_json(std::io::BufWriter::new(file))
    }
}
