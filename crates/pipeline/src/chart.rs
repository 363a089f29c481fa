//! Chart series
//!
//! The chart contract is one point per (month, parcel): x is the month's
//! start timestamp, the series is the parcel label and y the mean NDVI,
//! `null` when the parcel had no valid pixel that month.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vegtrend_algorithms::compositing::MonthlyComposite;
use vegtrend_algorithms::statistics::zonal_statistics;
use vegtrend_core::vector::{Parcel, ParcelCollection};

use crate::error::Result;

/// Display label of a parcel: owner span, town and category
pub fn parcel_label(parcel: &Parcel) -> String {
    format!(
        "SPAN: {},\nTown: {},\nCategory: {}",
        parcel.property_text("SPAN"),
        parcel.property_text("TNAME"),
        parcel.property_text("CAT")
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub series: String,
    pub value: Option<f64>,
}

/// Points of the NDVI chart, ordered by time then parcel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub scale: f64,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    /// Distinct series labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for p in &self.points {
            if !labels.contains(&p.series.as_str()) {
                labels.push(&p.series);
            }
        }
        labels
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Reduce each composite over every parcel at `scale` map units
pub fn chart_series(
    composites: &[&MonthlyComposite],
    parcels: &ParcelCollection,
    scale: f64,
) -> Result<ChartSeries> {
    let labels: Vec<String> = parcels.iter().map(parcel_label).collect();
    let mut ordered: Vec<&MonthlyComposite> = composites.to_vec();
    ordered.sort_by_key(|c| c.date());

    let mut points = Vec::with_capacity(ordered.len() * parcels.len());
    for composite in ordered {
        let month = zonal_statistics(composite, parcels, scale)?;
        let time = composite.time_start();
        for (stat, label) in month.stats.into_iter().zip(&labels) {
            points.push(ChartPoint {
                time,
                series: label.clone(),
                value: stat.mean,
            });
        }
    }
    Ok(ChartSeries { scale, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};
    use vegtrend_core::raster::{GeoTransform, Raster};
    use vegtrend_core::time::DateWindow;
    use vegtrend_core::vector::AttributeValue;

    fn square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (40.0, 0.0), (40.0, 40.0), (0.0, 40.0), (0.0, 0.0)]),
            vec![],
        )])
    }

    fn composite(month: u32, value: Option<f64>) -> MonthlyComposite {
        MonthlyComposite {
            year: 2020,
            month,
            window: DateWindow::month(2020, month).unwrap(),
            image_count: 1,
            report: Default::default(),
            mean: None,
            ndvi: value.map(|v| {
                Raster::filled(4, 4, v).with_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0))
            }),
        }
    }

    #[test]
    fn test_label() {
        let p = Parcel::new("1", square())
            .with_property("SPAN", AttributeValue::Int(7))
            .with_property("TNAME", AttributeValue::String("Milton".into()));
        assert_eq!(parcel_label(&p), "SPAN: 7,\nTown: Milton,\nCategory: null");
    }

    #[test]
    fn test_series_sorted_by_time() {
        let parcels: ParcelCollection = vec![Parcel::new("1", square())].into_iter().collect();
        let feb = composite(2, None);
        let jan = composite(1, Some(0.7));
        let chart = chart_series(&[&feb, &jan], &parcels, 10.0).unwrap();
        assert_eq!(chart.len(), 2);
        assert_eq!(chart.points[0].time, jan.time_start());
        assert!((chart.points[0].value.unwrap() - 0.7).abs() < 1e-10);
        assert_eq!(chart.points[1].value, None);
        assert_eq!(chart.labels().len(), 1);
    }
}
