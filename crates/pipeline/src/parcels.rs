//! Parcel loading from GeoJSON

use std::path::Path;

use geo::{MultiPolygon, Polygon};
use geojson::{Feature, GeoJson};
use serde_json::Value;
use vegtrend_core::vector::{AttributeValue, Parcel, ParcelCollection};

use crate::error::{PipelineError, Result};

fn attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn polygonal(feature: &Feature, index: usize) -> Result<MultiPolygon<f64>> {
    let geometry = feature
        .geometry
        .clone()
        .ok_or_else(|| PipelineError::GeoJson(format!("feature #{index} has no geometry")))?;
    let geometry = geo::Geometry::<f64>::try_from(geometry)
        .map_err(|e| PipelineError::GeoJson(format!("feature #{index}: {e}")))?;
    match geometry {
        geo::Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::GeometryCollection(gc) => {
            // Keep the polygonal members only
            let polygons: Vec<Polygon<f64>> = gc
                .into_iter()
                .flat_map(|g| match g {
                    geo::Geometry::Polygon(p) => vec![p],
                    geo::Geometry::MultiPolygon(mp) => mp.0,
                    _ => Vec::new(),
                })
                .collect();
            if polygons.is_empty() {
                return Err(PipelineError::GeoJson(format!(
                    "feature #{index} has no polygonal geometry"
                )));
            }
            Ok(MultiPolygon::new(polygons))
        }
        _ => Err(PipelineError::GeoJson(format!(
            "feature #{index} is not a polygon"
        ))),
    }
}

/// Parse a GeoJSON FeatureCollection of parcel polygons.
///
/// The parcel id is the text of `id_field`; features without it fall back
/// to the feature id, then to their position in the collection. Ids need
/// not be unique: the parts of a multipart holding share one.
pub fn parse_parcels(text: &str, id_field: &str) -> Result<ParcelCollection> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| PipelineError::GeoJson(e.to_string()))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(PipelineError::GeoJson("expected a FeatureCollection".to_string()));
    };

    let mut parcels = ParcelCollection::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let geometry = polygonal(feature, index)?;
        let properties = feature.properties.as_ref();
        let id = properties
            .and_then(|p| p.get(id_field))
            .filter(|v| !v.is_null())
            .map(|v| attribute(v).to_string())
            .or_else(|| {
                feature.id.as_ref().map(|id| match id {
                    geojson::feature::Id::String(s) => s.clone(),
                    geojson::feature::Id::Number(n) => n.to_string(),
                })
            })
            .unwrap_or_else(|| index.to_string());

        let mut parcel = Parcel::new(id, geometry);
        for (key, value) in properties.into_iter().flatten() {
            parcel = parcel.with_property(key.clone(), attribute(value));
        }
        parcels.push(parcel);
    }
    Ok(parcels)
}

/// Read a GeoJSON parcel file
pub fn load_parcels(path: impl AsRef<Path>, id_field: &str) -> Result<ParcelCollection> {
    let text = std::fs::read_to_string(path)?;
    parse_parcels(&text, id_field)
}
