//! # vegtrend algorithms
//!
//! The raster/vector processing steps of the parcel NDVI pipeline.
//!
//! ## Algorithm Categories
//!
//! - **join**: Relational operators with an explicit cardinality policy
//!   (equi-join keep-first, distance join keep-all)
//! - **vector**: Simplification, dissolve, rasterization, spatial selection
//! - **imagery**: NDVI, edge and cloud masking of acquisitions
//! - **compositing**: Annual low-vegetation baselines and monthly NDVI composites
//! - **statistics**: Area-weighted zonal means over parcel polygons
//! - **timeseries**: Folding monthly statistics into per-parcel series

pub mod compositing;
pub mod imagery;
pub mod join;
mod maybe_rayon;
pub mod statistics;
pub mod timeseries;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::compositing::{
        annual_baseline, monthly_composite, AnnualBaseline, AnnualBaselines, BaselineParams,
        MonthlyComposite,
    };
    pub use crate::imagery::{
        get_filtered_s2sr, ndvi, normalized_difference, BandNames, CloudMaskedCompositor,
        CollectionKind, ImagerySource, InMemorySource,
    };
    pub use crate::join::{distance_join, equi_join_first, DistanceMatch, EquiJoin};
    pub use crate::statistics::{reduce_regions, zonal_statistics, MonthlyZonalStats, ZonalStatistic};
    pub use crate::timeseries::{accumulate, accumulate_parallel, ParcelSeries, SeriesState};
    pub use crate::vector::{dissolve, select_parcels, Selection, SelectionParams};
    pub use vegtrend_core::prelude::*;
}
