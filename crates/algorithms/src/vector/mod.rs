//! Vector operations on parcel geometries
//!
//! - Simplify: Douglas-Peucker with ring protection, used by the distance join
//! - Dissolve: union of many polygons into one region
//! - Rasterize: region masks and per-cell polygon coverage fractions
//! - Selection: distance + type selection of parcels around a reference

mod rasterize;
mod selection;
mod simplify;
mod spatial;

pub use rasterize::{cell_coverage, region_mask, CellWeight};
pub use selection::{select_parcels, Selection, SelectionParams};
pub use simplify::simplify_multipolygon;
pub use spatial::dissolve;
