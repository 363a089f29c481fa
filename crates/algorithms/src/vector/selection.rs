//! Spatial selection of parcels around a reference parcel

use geo::MultiPolygon;
use vegtrend_core::vector::{AttributeValue, Parcel, ParcelCollection};

use crate::join::distance_join;
use crate::vector::dissolve;

/// Parameters for [`select_parcels`]
#[derive(Debug, Clone)]
pub struct SelectionParams {
    /// Maximum distance from the reference geometry, in map units
    pub distance: f64,
    /// Tolerance of the approximate distance computation, in map units
    pub max_error: f64,
    /// Attribute holding the feature type
    pub type_field: String,
    /// Required value of `type_field`
    pub type_value: String,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            distance: 500.0,
            max_error: 10.0,
            type_field: "PROPTYPE".to_string(),
            type_value: "PARCEL".to_string(),
        }
    }
}

/// Result of a spatial selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// Selected parcels, in universe order
    pub parcels: ParcelCollection,
    /// Measured distance of each selected parcel to the reference
    pub distances: Vec<f64>,
    /// Dissolved union of the selected geometries; empty when nothing matched
    pub region: MultiPolygon<f64>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }
}

/// Select the parcels of `universe` within `params.distance` of `reference`
/// whose type attribute equals `params.type_value`, and dissolve them into
/// one region.
///
/// The distance test is approximate within `params.max_error` (see
/// [`distance_join`]). An empty selection is not an error: it produces an
/// empty region, against which every imagery query comes back empty.
pub fn select_parcels(
    reference: &MultiPolygon<f64>,
    universe: &ParcelCollection,
    params: &SelectionParams,
) -> Selection {
    let geometries: Vec<&MultiPolygon<f64>> = universe.iter().map(Parcel::geometry).collect();
    let matches = distance_join(reference, &geometries, params.distance, params.max_error);

    let mut parcels = ParcelCollection::new();
    let mut distances = Vec::new();
    for m in matches {
        let Some(parcel) = universe.get(m.index) else {
            continue;
        };
        let is_type = parcel
            .get_property(&params.type_field)
            .and_then(AttributeValue::as_str)
            == Some(params.type_value.as_str());
        if is_type {
            parcels.push(parcel.clone());
            distances.push(m.distance);
        }
    }

    let region = dissolve(parcels.iter().map(Parcel::geometry));

    Selection {
        parcels,
        distances,
        region,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, LineString, Polygon};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
                (x, y),
            ]),
            vec![],
        )])
    }

    fn parcel(id: &str, geometry: MultiPolygon<f64>, kind: &str) -> Parcel {
        Parcel::new(id, geometry)
            .with_property("PROPTYPE", AttributeValue::String(kind.to_string()))
    }

    fn universe() -> ParcelCollection {
        vec![
            parcel("ref", square(0.0, 0.0, 100.0), "PARCEL"),
            parcel("east", square(100.0, 0.0, 100.0), "PARCEL"),
            parcel("road", square(0.0, 100.0, 100.0), "ROW"),
            parcel("far", square(2000.0, 0.0, 100.0), "PARCEL"),
            parcel("near", square(500.0, 0.0, 50.0), "PARCEL"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_selects_by_distance_and_type() {
        let all = universe();
        let reference = all.get(0).unwrap().geometry().clone();
        let selection = select_parcels(&reference, &all, &SelectionParams::default());

        let ids: Vec<_> = selection.parcels.iter().map(Parcel::id).collect();
        assert_eq!(ids, vec!["ref", "east", "near"]);
        assert!(selection.distances.iter().all(|d| *d <= 500.0));
        assert!(selection
            .parcels
            .iter()
            .all(|p| p.get_property("PROPTYPE").and_then(AttributeValue::as_str) == Some("PARCEL")));
    }

    #[test]
    fn test_region_is_dissolved_union() {
        let all = universe();
        let reference = all.get(0).unwrap().geometry().clone();
        let selection = select_parcels(&reference, &all, &SelectionParams::default());

        // ref + east merge; near stays apart
        assert_eq!(selection.region.0.len(), 2);
        assert!((selection.region.unsigned_area() - (20_000.0 + 2_500.0)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_selection_gives_empty_region() {
        let reference = square(10_000.0, 10_000.0, 10.0);
        let selection = select_parcels(&reference, &universe(), &SelectionParams::default());
        assert!(selection.is_empty());
        assert!(selection.region.0.is_empty());
    }
}
