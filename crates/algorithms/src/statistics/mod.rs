//! Statistical reduction of rasters over vector zones
//!
//! - **zonal**: Area-weighted means of a raster over parcel polygons

pub mod zonal;

pub use zonal::{
    reduce_regions, resample_mean, zonal_mean, zonal_statistics, MonthlyZonalStats,
    ZonalStatistic,
};
