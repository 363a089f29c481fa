//! End-to-end runs on a synthetic in-memory catalog

use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use geo::{LineString, MultiPolygon, Polygon};
use vegtrend_algorithms::imagery::{CollectionKind, InMemorySource};
use vegtrend_core::imagery::SpectralImage;
use vegtrend_core::raster::{GeoTransform, Raster};
use vegtrend_core::vector::{AttributeValue, Parcel, ParcelCollection};
use vegtrend_parallel::ProcessingMode;
use vegtrend_pipeline::{select, Pipeline, PipelineConfig, PipelineError, PipelineReport};

const N: usize = 10;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
        vec![],
    )])
}

fn parcel(id: &str, kind: &str, geometry: MultiPolygon<f64>) -> Parcel {
    Parcel::new(id, geometry)
        .with_property("PARCID", AttributeValue::String(id.to_string()))
        .with_property("PROPTYPE", AttributeValue::String(kind.to_string()))
        .with_property("SPAN", AttributeValue::Int(3))
        .with_property("TNAME", AttributeValue::String("Milton".to_string()))
}

fn universe() -> ParcelCollection {
    vec![
        parcel("MY364-X", "PARCEL", rect(0.0, 0.0, 20.0, 20.0)),
        parcel("P2", "PARCEL", rect(30.0, 0.0, 50.0, 20.0)),
        parcel("ROAD", "ROW", rect(0.0, 25.0, 100.0, 30.0)),
        parcel("FAR", "PARCEL", rect(2000.0, 0.0, 2020.0, 20.0)),
    ]
    .into_iter()
    .collect()
}

/// Band of a tile whose upper-left corner is at (`origin_x`, 100), with
/// cells `cell` units wide
fn band(origin_x: f64, cell: f64, value: f64) -> Raster<f64> {
    let cells = (N as f64 * 10.0 / cell) as usize;
    Raster::filled(cells, cells, value)
        .with_transform(GeoTransform::new(origin_x, 100.0, cell, -cell))
}

/// Clear or cloudy scene; the edge bands and cloud probability come at the
/// coarser resolutions of the real products
fn add_tile(
    source: &mut InMemorySource,
    id: &str,
    (year, month, day): (i32, u32, u32),
    origin_x: f64,
    (nir, red): (f64, f64),
    cloud_probability: f64,
) {
    let when = Utc.with_ymd_and_hms(year, month, day, 10, 30, 0).unwrap();
    let sr = SpectralImage::new(id, when)
        .with_band("B8", band(origin_x, 10.0, nir))
        .with_band("B4", band(origin_x, 10.0, red))
        .with_band("B8A", band(origin_x, 20.0, 0.3))
        .with_band("B9", band(origin_x, 50.0, 0.3));
    let cloud = SpectralImage::new(id, when)
        .with_band("probability", band(origin_x, 20.0, cloud_probability));
    source.add(CollectionKind::SurfaceReflectance, sr);
    source.add(CollectionKind::CloudProbability, cloud);
}

fn add_scene(
    source: &mut InMemorySource,
    id: &str,
    date: (i32, u32, u32),
    reflectance: (f64, f64),
    cloud_probability: f64,
) {
    add_tile(source, id, date, 0.0, reflectance, cloud_probability);
}

/// Vegetated every month 2019-2023, except:
/// - the 2020 summer reference window is bare, so the 2020 mask flags everything
/// - March 2021 only has a scene with cloud probability 80
fn catalog() -> InMemorySource {
    let mut source = InMemorySource::new();
    for year in 2019..=2023 {
        let summer = if year == 2020 { (0.3, 0.2) } else { (0.8, 0.1) };
        add_scene(&mut source, &format!("ref_{year}"), (year, 6, 15), summer, 5.0);
        for month in 1..=12 {
            let id = format!("m_{year}_{month}");
            if (year, month) == (2021, 3) {
                add_scene(&mut source, &id, (year, month, 10), (0.7, 0.1), 80.0);
            } else if !(year == 2020 && (6..=7).contains(&month)) {
                add_scene(&mut source, &id, (year, month, 10), (0.7, 0.1), 5.0);
            }
        }
    }
    source
}

fn run_on(
    config: PipelineConfig,
    source: &InMemorySource,
    parcels: &ParcelCollection,
) -> vegtrend_pipeline::Result<vegtrend_pipeline::PipelineOutput> {
    Pipeline::new(config, source, parcels)?.run()
}

fn run(config: PipelineConfig) -> vegtrend_pipeline::Result<vegtrend_pipeline::PipelineOutput> {
    run_on(config, &catalog(), &universe())
}

#[test]
fn selection_keeps_nearby_parcels_only() {
    let output = run(PipelineConfig::default()).unwrap();
    let ids: Vec<_> = output.selection.parcels.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["MY364-X", "P2"]);
    assert!(output.selection.distances.iter().all(|d| *d <= 500.0 + 10.0));
}

#[test]
fn standalone_selection_matches_run() {
    let config = PipelineConfig::default();
    let (reference, selection) = select(&universe(), &config).unwrap();
    let output = run(config).unwrap();
    assert_eq!(reference.id(), output.reference.id());
    assert_eq!(selection.distances, output.selection.distances);
    assert_eq!(selection.parcels.len(), output.selection.parcels.len());
}

#[test]
fn two_year_fold_has_24_entries() {
    let output = run(PipelineConfig::default()).unwrap();
    assert_eq!(output.series.parcel_count(), 2);
    for (_, series) in output.series.iter() {
        assert_eq!(series.dates.len(), 24);
        assert_eq!(series.values.len(), 24);
        assert!(series.dates.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn low_vegetation_year_is_missing_not_zero() {
    let output = run(PipelineConfig::default()).unwrap();
    let series = output.series.get("MY364-X").unwrap();
    // First twelve entries are 2020
    assert!(series.values[..12].iter().all(Option::is_none));
    // 2021 is vegetated and unmasked, apart from the cloudy March
    assert_relative_eq!(series.values[12].unwrap(), 0.75, epsilon = 1e-9);
}

#[test]
fn cloudy_scene_fully_masked() {
    let output = run(PipelineConfig::default()).unwrap();
    let march = output
        .composites
        .iter()
        .find(|c| (c.year, c.month) == (2021, 3))
        .unwrap();
    assert_eq!(march.image_count, 1);
    assert_eq!(march.valid_count(), 0);

    let series = output.series.get("P2").unwrap();
    assert_eq!(series.values[14], None);
}

#[test]
fn offset_tiles_composite_together() {
    // A second tile, shifted east, in May 2021 overlaps the east half of P2
    let mut source = catalog();
    add_tile(&mut source, "east_2021_5", (2021, 5, 20), 40.0, (0.9, 0.1), 5.0);
    let output = run_on(PipelineConfig::default(), &source, &universe()).unwrap();

    let may = output
        .composites
        .iter()
        .find(|c| (c.year, c.month) == (2021, 5))
        .unwrap();
    assert_eq!(may.image_count, 2);

    let reference = output.series.get("MY364-X").unwrap();
    assert_relative_eq!(reference.values[16].unwrap(), 0.75, epsilon = 1e-9);
    let p2 = output.series.get("P2").unwrap().values[16].unwrap();
    assert!(p2 > 0.75 && p2 < 0.8, "{p2}");
}

#[test]
fn shared_parcel_id_keeps_separate_series() {
    // A second part of P2, farther east
    let mut parcels: Vec<Parcel> = universe().into_iter().collect();
    parcels.insert(2, parcel("P2", "PARCEL", rect(60.0, 0.0, 80.0, 20.0)));
    let parcels: ParcelCollection = parcels.into_iter().collect();

    let output = run_on(PipelineConfig::default(), &catalog(), &parcels).unwrap();
    let ids: Vec<_> = output.selection.parcels.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["MY364-X", "P2", "P2"]);
    assert_eq!(output.series.parcel_count(), 3);
    for (_, series) in output.series.iter() {
        assert_eq!(series.values.len(), 24);
    }
    assert_relative_eq!(output.series.series(2).unwrap().values[12].unwrap(), 0.75, epsilon = 1e-9);
    assert_eq!(output.chart.len(), 60 * 3);

    let report = PipelineReport::from_output(&output);
    assert_eq!(report.parcels.len(), 3);
    assert_eq!(report.parcels[2].values.len(), 24);
}

#[test]
fn monthly_composites_cover_configured_span() {
    let output = run(PipelineConfig::default()).unwrap();
    assert_eq!(output.composites.len(), 60);
    assert_eq!(output.baselines.len(), 6);
    assert_eq!(output.composites[0].property_name(), "mean_ndvi_2019_1");
    // Chart covers 2019-2023 for both parcels
    assert_eq!(output.chart.len(), 60 * 2);
}

#[test]
fn processing_modes_agree() {
    let sequential = run(PipelineConfig {
        processing: ProcessingMode::Sequential,
        ..Default::default()
    })
    .unwrap();
    let pooled = run(PipelineConfig {
        processing: ProcessingMode::ParallelWith(2),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(sequential.series, pooled.series);
    assert_eq!(sequential.chart, pooled.chart);
}

#[test]
fn missing_reference_is_fault() {
    let err = run(PipelineConfig {
        reference_parcel_id: "NOPE".to_string(),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, PipelineError::ReferenceNotFound { .. }));
}

#[test]
fn empty_selection_is_not_fault() {
    let output = run(PipelineConfig {
        parcel_type: "WETLAND".to_string(),
        ..Default::default()
    })
    .unwrap();
    assert!(output.selection.is_empty());
    assert_eq!(output.series.parcel_count(), 0);
    assert!(output.composites.iter().all(|c| c.image_count == 0));
    assert!(output.chart.is_empty());
}

#[test]
fn report_round_trips_through_json() {
    let output = run(PipelineConfig::default()).unwrap();
    let report = PipelineReport::from_output(&output);
    let mut buffer = Vec::new();
    report.write_json(&mut buffer).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(value["reference"], "MY364-X");
    let first = &value["parcels"][0];
    assert_eq!(first["dates"].as_array().unwrap().len(), 24);
    assert!(first["values"][0].is_null());
    assert_eq!(first["label"], "SPAN: 3,\nTown: Milton,\nCategory: null");
}
