//! # vegtrend pipeline
//!
//! Monthly NDVI time series for the parcels around a reference parcel.
//!
//! - `config`: the single configuration structure of a run
//! - `catalog`: STAC-like scene manifest implementing the imagery source
//! - `parcels`: GeoJSON parcel loading
//! - `pipeline`: task-graph assembly and evaluation
//! - `chart`, `output`: chart series and JSON export

pub mod catalog;
pub mod chart;
pub mod config;
pub mod error;
pub mod output;
pub mod parcels;
pub mod pipeline;

pub use catalog::{ManifestCatalog, SceneManifest};
pub use chart::{parcel_label, ChartPoint, ChartSeries};
pub use config::{BandConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use output::PipelineReport;
pub use parcels::{load_parcels, parse_parcels};
pub use pipeline::{find_reference, select, FoldProgress, Pipeline, PipelineOutput};
