//! Scene manifest catalog
//!
//! A STAC-like JSON manifest lists the acquisitions of the two imagery
//! collections. Each item carries an acquisition id, its datetime, a
//! footprint bbox and one single-band GeoTIFF asset per band:
//!
//! ```json
//! {
//!   "collections": {
//!     "reflectance": [
//!       { "id": "20200612T101031_T32TQM", "datetime": "2020-06-12T10:10:31Z",
//!         "bbox": [500000.0, 4990000.0, 510000.0, 5000000.0],
//!         "assets": { "B8": { "href": "sr/20200612_B8.tif" }, "B4": { "href": "sr/20200612_B4.tif" } } }
//!     ],
//!     "cloud_probability": [ ... ]
//!   }
//! }
//! ```
//!
//! Relative hrefs resolve against the manifest's directory. Bands are read
//! lazily, only for items a query selects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geo::{Intersects, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use vegtrend_algorithms::imagery::{CollectionKind, ImagerySource};
use vegtrend_core::imagery::{ImageCollection, SpectralImage};
use vegtrend_core::io::read_band;
use vegtrend_core::time::DateWindow;

use crate::error::{PipelineError, Result};

/// Top-level manifest document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    pub collections: ManifestCollections,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestCollections {
    #[serde(default)]
    pub reflectance: Vec<SceneItem>,
    #[serde(default)]
    pub cloud_probability: Vec<SceneItem>,
}

/// One acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneItem {
    /// Acquisition id, shared by the reflectance and cloud items of a scene
    pub id: String,
    pub datetime: DateTime<Utc>,
    /// Footprint `[west, south, east, north]` in map units
    pub bbox: [f64; 4],
    /// Band name -> asset
    pub assets: BTreeMap<String, SceneAsset>,
}

impl SceneItem {
    fn footprint(&self) -> Rect<f64> {
        let [w, s, e, n] = self.bbox;
        Rect::new((w, s), (e, n))
    }
}

/// A single-band GeoTIFF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneAsset {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SceneManifest {
    pub fn items(&self, kind: CollectionKind) -> &[SceneItem] {
        match kind {
            CollectionKind::SurfaceReflectance => &self.collections.reflectance,
            CollectionKind::CloudProbability => &self.collections.cloud_probability,
        }
    }

    fn check(&self) -> Result<()> {
        for item in self
            .collections
            .reflectance
            .iter()
            .chain(&self.collections.cloud_probability)
        {
            let [w, s, e, n] = item.bbox;
            if !(w <= e && s <= n) {
                return Err(PipelineError::Manifest(format!(
                    "item '{}' has an inverted bbox",
                    item.id
                )));
            }
            if item.assets.is_empty() {
                return Err(PipelineError::Manifest(format!("item '{}' has no assets", item.id)));
            }
        }
        Ok(())
    }
}

/// [`ImagerySource`] backed by a scene manifest on disk
#[derive(Debug, Clone)]
pub struct ManifestCatalog {
    manifest: SceneManifest,
    base_dir: PathBuf,
}

impl ManifestCatalog {
    /// Read a manifest file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let manifest: SceneManifest = serde_json::from_str(&text)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(manifest, base_dir)
    }

    pub fn new(manifest: SceneManifest, base_dir: impl Into<PathBuf>) -> Result<Self> {
        manifest.check()?;
        Ok(Self {
            manifest,
            base_dir: base_dir.into(),
        })
    }

    pub fn manifest(&self) -> &SceneManifest {
        &self.manifest
    }

    fn load(&self, item: &SceneItem) -> vegtrend_core::Result<SpectralImage> {
        let mut image = SpectralImage::new(item.id.clone(), item.datetime);
        for (band, asset) in &item.assets {
            let raster = read_band(self.base_dir.join(&asset.href))?;
            image.insert_band(band.clone(), raster);
        }
        Ok(image)
    }
}

impl ImagerySource for ManifestCatalog {
    fn query(
        &self,
        kind: CollectionKind,
        region: &MultiPolygon<f64>,
        window: &DateWindow,
    ) -> vegtrend_core::Result<ImageCollection> {
        self.manifest
            .items(kind)
            .iter()
            .filter(|item| window.contains(&item.datetime) && region.intersects(&item.footprint()))
            .map(|item| self.load(item))
            .collect()
    }
}
