//! Per-parcel NDVI time series
//!
//! - **accumulate**: pure fold of monthly zonal statistics into ordered
//!   per-parcel `(dates, values)` sequences, plus a map + sort-merge variant

mod accumulate;

pub use accumulate::{accumulate, accumulate_parallel, fold_step, ParcelSeries, SeriesState};
