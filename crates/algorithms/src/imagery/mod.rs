//! Imagery: spectral index and cloud-masked acquisition filtering
//!
//! - NDVI / generic normalized difference
//! - Imagery sources: the catalog seam the pipeline queries
//! - Cloud-masked filtering: equi-join with cloud probability, cloud and
//!   edge masks, clipping to the region of interest

mod cloud_mask;
mod indices;
mod source;

pub use cloud_mask::{
    clip_to_region, get_filtered_s2sr, mask_clouds, mask_edges, BandNames, CloudMaskReport,
    CloudMaskedCompositor,
};
pub use indices::{image_ndvi, ndvi, normalized_difference};
pub use source::{CollectionKind, ImagerySource, InMemorySource};
