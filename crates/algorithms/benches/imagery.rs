//! Benchmarks for NDVI and polygon zonal reduction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{LineString, MultiPolygon, Polygon};
use vegtrend_algorithms::imagery::ndvi;
use vegtrend_algorithms::statistics::reduce_regions;
use vegtrend_core::vector::{Parcel, ParcelCollection};
use vegtrend_core::{GeoTransform, Raster};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

/// A `side` x `side` checkerboard of square parcels tiling the band extent
fn create_parcels(size: usize, side: usize) -> ParcelCollection {
    let extent = size as f64 * 10.0;
    let step = extent / side as f64;
    let mut parcels = ParcelCollection::new();
    for i in 0..side {
        for j in 0..side {
            let (x0, y0) = (i as f64 * step, j as f64 * step);
            // Inset so that parcels cut through cells
            let (x1, y1) = (x0 + step * 0.83, y0 + step * 0.91);
            let ring = LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]);
            let geometry = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
            parcels.push(Parcel::new(format!("p{i}_{j}"), geometry));
        }
    }
    parcels
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 512, 1024, 2048] {
        let nir = create_band(size, 300.0);
        let red = create_band(size, 100.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&nir), black_box(&red)).unwrap())
        });
    }
    group.finish();
}

fn bench_reduce_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics/reduce_regions");
    let size = 512;
    let values = ndvi(&create_band(size, 300.0), &create_band(size, 100.0)).unwrap();
    for side in [4, 16, 32] {
        let parcels = create_parcels(size, side);
        for scale in [10.0, 20.0] {
            let id = BenchmarkId::new(format!("scale{scale}"), side * side);
            group.bench_with_input(id, &parcels, |b, parcels| {
                b.iter(|| reduce_regions(black_box(&values), black_box(parcels), scale).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_reduce_regions);
criterion_main!(benches);
