//! Pipeline configuration
//!
//! Every threshold, scale and date range the pipeline uses lives in one
//! [`PipelineConfig`]. The defaults reproduce the reference run; a JSON file
//! may override any subset of fields.

use std::ops::RangeInclusive;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vegtrend_algorithms::compositing::BaselineParams;
use vegtrend_algorithms::imagery::{BandNames, CloudMaskedCompositor};
use vegtrend_algorithms::vector::SelectionParams;
use vegtrend_core::time::ymd;
use vegtrend_core::Error;
use vegtrend_parallel::ProcessingMode;

use crate::error::Result;

/// Band names in the imagery catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub nir: String,
    pub red: String,
    pub edge: [String; 2],
    pub probability: String,
}

impl Default for BandConfig {
    fn default() -> Self {
        let names = BandNames::default();
        Self {
            nir: names.nir,
            red: names.red,
            edge: names.edge,
            probability: names.probability,
        }
    }
}

impl From<&BandConfig> for BandNames {
    fn from(c: &BandConfig) -> Self {
        BandNames {
            nir: c.nir.clone(),
            red: c.red.clone(),
            edge: c.edge.clone(),
            probability: c.probability.clone(),
        }
    }
}

/// Configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Value of `parcel_id_field` identifying the reference parcel
    pub reference_parcel_id: String,
    pub parcel_id_field: String,
    pub type_field: String,
    pub parcel_type: String,

    /// Selection distance around the reference, map units
    pub distance_threshold: f64,
    /// Tolerance of the approximate distance test, map units
    pub distance_max_error: f64,

    /// Pixels with cloud probability at or above this are masked (0-100)
    pub max_cloud_probability: f64,
    /// Pixels with baseline NDVI at or below this are low vegetation
    pub low_ndvi_threshold: f64,
    /// Cell size of the grid every band is resampled onto, map units
    pub resolution: f64,

    /// Baseline years (inclusive). Monthly composites run from January of
    /// the first year up to, not including, January of the last.
    pub years: [i32; 2],
    pub baseline_start_month: u32,
    pub baseline_start_day: u32,
    pub baseline_months: u32,

    /// Years folded into the parcel series (inclusive)
    pub fold_years: [i32; 2],
    pub parcel_scale: f64,

    /// Years reduced for the chart (inclusive)
    pub chart_years: [i32; 2],
    pub chart_scale: f64,

    pub bands: BandConfig,
    pub processing: ProcessingMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_parcel_id: "MY364-X".to_string(),
            parcel_id_field: "PARCID".to_string(),
            type_field: "PROPTYPE".to_string(),
            parcel_type: "PARCEL".to_string(),
            distance_threshold: 500.0,
            distance_max_error: 10.0,
            max_cloud_probability: 75.0,
            low_ndvi_threshold: 0.6,
            resolution: 10.0,
            years: [2019, 2024],
            baseline_start_month: 6,
            baseline_start_day: 1,
            baseline_months: 2,
            fold_years: [2020, 2021],
            parcel_scale: 20.0,
            chart_years: [2019, 2023],
            chart_scale: 500.0,
            bands: BandConfig::default(),
            processing: ProcessingMode::default(),
        }
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; absent fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could make sense of
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_cloud_probability) {
            return Err(invalid(
                "max_cloud_probability",
                self.max_cloud_probability,
                "must be within 0..=100",
            )
            .into());
        }
        if !(-1.0..=1.0).contains(&self.low_ndvi_threshold) {
            return Err(invalid(
                "low_ndvi_threshold",
                self.low_ndvi_threshold,
                "NDVI lies within -1..=1",
            )
            .into());
        }
        for (name, value) in [
            ("distance_threshold", self.distance_threshold),
            ("distance_max_error", self.distance_max_error),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(invalid(name, value, "must be >= 0").into());
            }
        }
        for (name, scale) in [
            ("resolution", self.resolution),
            ("parcel_scale", self.parcel_scale),
            ("chart_scale", self.chart_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(invalid(name, scale, "must be a positive number of map units").into());
            }
        }
        for (name, [first, last]) in [
            ("years", self.years),
            ("fold_years", self.fold_years),
            ("chart_years", self.chart_years),
        ] {
            if first > last {
                return Err(invalid(name, format!("[{first}, {last}]"), "range is inverted").into());
            }
        }
        if self.baseline_months == 0 {
            return Err(invalid("baseline_months", 0, "must be at least one month").into());
        }
        // Catches impossible dates such as Feb 30
        ymd(self.years[0], self.baseline_start_month, self.baseline_start_day)?;
        if let ProcessingMode::ParallelWith(0) = self.processing {
            return Err(invalid("processing", "threads: 0", "needs at least one thread").into());
        }
        Ok(())
    }

    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            distance: self.distance_threshold,
            max_error: self.distance_max_error,
            type_field: self.type_field.clone(),
            type_value: self.parcel_type.clone(),
        }
    }

    pub fn compositor(&self) -> Result<CloudMaskedCompositor> {
        Ok(CloudMaskedCompositor::new(self.max_cloud_probability)?
            .with_bands((&self.bands).into())
            .with_resolution(self.resolution))
    }

    pub fn baseline_params(&self) -> BaselineParams {
        BaselineParams {
            start_month: self.baseline_start_month,
            start_day: self.baseline_start_day,
            months: self.baseline_months,
            low_ndvi_threshold: self.low_ndvi_threshold,
        }
    }

    /// Years with an annual baseline
    pub fn baseline_years(&self) -> RangeInclusive<i32> {
        self.years[0]..=self.years[1]
    }

    /// `[first, end)` span of the monthly composites
    pub fn monthly_span(&self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((ymd(self.years[0], 1, 1)?, ymd(self.years[1], 1, 1)?))
    }

    pub fn fold_range(&self) -> RangeInclusive<i32> {
        self.fold_years[0]..=self.fold_years[1]
    }

    pub fn chart_range(&self) -> RangeInclusive<i32> {
        self.chart_years[0]..=self.chart_years[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.baseline_years().count(), 6);
        let (first, end) = config.monthly_span().unwrap();
        assert_eq!(first, ymd(2019, 1, 1).unwrap());
        assert_eq!(end, ymd(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"fold_years": [2021, 2022], "processing": {"threads": 2}}"#)
                .unwrap();
        assert_eq!(config.fold_years, [2021, 2022]);
        assert_eq!(config.processing, ProcessingMode::ParallelWith(2));
        assert_eq!(config.max_cloud_probability, 75.0);
        assert_eq!(config.bands.edge, ["B8A".to_string(), "B9".to_string()]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            PipelineConfig {
                max_cloud_probability: 101.0,
                ..Default::default()
            },
            PipelineConfig {
                years: [2024, 2019],
                ..Default::default()
            },
            PipelineConfig {
                parcel_scale: 0.0,
                ..Default::default()
            },
            PipelineConfig {
                resolution: -10.0,
                ..Default::default()
            },
            PipelineConfig {
                baseline_start_day: 31,
                baseline_start_month: 6,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"distance_threshold": 250}}"#).unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.distance_threshold, 250.0);
        assert_eq!(config.selection_params().distance, 250.0);
    }
}
