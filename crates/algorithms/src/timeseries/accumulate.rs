//! Time series accumulation
//!
//! The state holds, for each parcel, two parallel sequences, dates and
//! values, matched positionally. [`fold_step`] is a pure function
//! `(state, month) -> state'` that appends one month to every parcel; the
//! per-month property name is used only to reduce the month and never
//! reaches the state, so the state shape is the same before and after each
//! step.
//!
//! [`accumulate`] is the strict left fold: each step needs the previous
//! one, so months run one after another. [`accumulate_parallel`] reduces
//! every month independently, sorts the results by date and merges them
//! with the same step, trading the strict chain for parallel reductions.

use std::collections::HashMap;

use chrono::NaiveDate;
use vegtrend_core::vector::ParcelCollection;
use vegtrend_core::{Error, Result};

use crate::compositing::MonthlyComposite;
use crate::maybe_rayon::*;
use crate::statistics::{zonal_statistics, MonthlyZonalStats};

/// Dates and mean NDVI values of one parcel; always the same length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelSeries {
    pub dates: Vec<NaiveDate>,
    /// `None` where the month had no valid pixel over the parcel
    pub values: Vec<Option<f64>>,
}

impl ParcelSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// `(date, value)` pairs in chronological order
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    fn push(&mut self, date: NaiveDate, value: Option<f64>) {
        self.dates.push(date);
        self.values.push(value);
    }
}

/// Accumulator state: one series per parcel, in parcel order.
///
/// Series are keyed by the parcel's position in the collection, not by its
/// id, so parcels sharing an id (parts of one holding) keep separate series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesState {
    records: Vec<(String, ParcelSeries)>,
    last_date: Option<NaiveDate>,
}

impl SeriesState {
    /// Empty series for each parcel
    pub fn empty(parcels: &ParcelCollection) -> Self {
        Self {
            records: parcels
                .iter()
                .map(|p| (p.id().to_string(), ParcelSeries::default()))
                .collect(),
            last_date: None,
        }
    }

    /// Series of the first parcel with id `parcel_id`
    pub fn get(&self, parcel_id: &str) -> Option<&ParcelSeries> {
        self.records
            .iter()
            .find(|(id, _)| id == parcel_id)
            .map(|(_, s)| s)
    }

    /// Series of the parcel at `index`
    pub fn series(&self, index: usize) -> Option<&ParcelSeries> {
        self.records.get(index).map(|(_, s)| s)
    }

    /// Series in parcel order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParcelSeries)> {
        self.records.iter().map(|(id, s)| (id.as_str(), s))
    }

    pub fn parcel_count(&self) -> usize {
        self.records.len()
    }

    /// Date of the last month folded in
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }
}

/// Append one month to every parcel series.
///
/// Months must arrive in strictly increasing date order. Statistics are
/// matched to parcels by position; a parcel absent from `month` receives a
/// missing value and statistics for positions the state does not hold are
/// ignored.
pub fn fold_step(mut state: SeriesState, month: &MonthlyZonalStats) -> Result<SeriesState> {
    if let Some(last) = state.last_date {
        if month.date <= last {
            return Err(Error::InvalidParameter {
                name: "date",
                value: month.date.to_string(),
                reason: format!("months must be folded in increasing order, last was {last}"),
            });
        }
    }

    let means: HashMap<usize, Option<f64>> =
        month.stats.iter().map(|s| (s.index, s.mean)).collect();

    for (index, (_, series)) in state.records.iter_mut().enumerate() {
        let value = means.get(&index).copied().flatten();
        series.push(month.date, value);
    }
    state.last_date = Some(month.date);
    Ok(state)
}

/// Strict left fold of `composites` (chronological order) over `parcels`,
/// reducing each month at `scale` map units.
pub fn accumulate(
    parcels: &ParcelCollection,
    composites: &[MonthlyComposite],
    scale: f64,
) -> Result<SeriesState> {
    composites
        .iter()
        .try_fold(SeriesState::empty(parcels), |state, composite| {
            let month = zonal_statistics(composite, parcels, scale)?;
            fold_step(state, &month)
        })
}

/// Map + sort-merge alternative to [`accumulate`].
///
/// Months are reduced in parallel, then sorted by date and merged with
/// [`fold_step`], so the input need not be ordered. The result equals
/// [`accumulate`] on the sorted input.
pub fn accumulate_parallel(
    parcels: &ParcelCollection,
    composites: &[MonthlyComposite],
    scale: f64,
) -> Result<SeriesState> {
    let mut months = composites
        .par_iter()
        .map(|composite| zonal_statistics(composite, parcels, scale))
        .collect::<Result<Vec<_>>>()?;
    months.sort_by_key(|m| m.date);
    months
        .iter()
        .try_fold(SeriesState::empty(parcels), fold_step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::ZonalStatistic;
    use geo::{LineString, MultiPolygon, Polygon};
    use vegtrend_core::raster::{GeoTransform, Raster};
    use vegtrend_core::time::DateWindow;
    use vegtrend_core::vector::Parcel;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    fn parcels() -> ParcelCollection {
        vec![
            Parcel::new("a", rect(0.0, 0.0, 20.0, 40.0)),
            Parcel::new("b", rect(20.0, 0.0, 40.0, 40.0)),
        ]
        .into_iter()
        .collect()
    }

    fn composite(year: i32, month: u32, value: Option<f64>) -> MonthlyComposite {
        let ndvi = value.map(|v| {
            Raster::filled(4, 4, v).with_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0))
        });
        MonthlyComposite {
            year,
            month,
            window: DateWindow::month(year, month).unwrap(),
            image_count: usize::from(value.is_some()),
            report: Default::default(),
            mean: None,
            ndvi,
        }
    }

    fn two_years() -> Vec<MonthlyComposite> {
        (2020..=2021)
            .flat_map(|y| (1..=12).map(move |m| (y, m)))
            .map(|(y, m)| {
                let value = (m % 3 != 0).then(|| 0.5 + m as f64 / 100.0);
                composite(y, m, value)
            })
            .collect()
    }

    fn stats(date: NaiveDate, values: &[(usize, &str, Option<f64>)]) -> MonthlyZonalStats {
        MonthlyZonalStats {
            property: "mean_ndvi".to_string(),
            date,
            stats: values
                .iter()
                .map(|(index, id, mean)| ZonalStatistic {
                    index: *index,
                    parcel_id: id.to_string(),
                    date,
                    mean: *mean,
                })
                .collect(),
        }
    }

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_lengths_match_month_count() {
        let state = accumulate(&parcels(), &two_years(), 20.0).unwrap();
        assert_eq!(state.parcel_count(), 2);
        for (_, series) in state.iter() {
            assert_eq!(series.dates.len(), 24);
            assert_eq!(series.values.len(), 24);
            assert!(series.dates.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_missing_months_stay_missing() {
        let state = accumulate(&parcels(), &two_years(), 20.0).unwrap();
        let a = state.get("a").unwrap();
        // March is composited without imagery
        assert_eq!(a.values[2], None);
        assert!((a.values[0].unwrap() - 0.51).abs() < 1e-10);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut months = two_years();
        months.swap(3, 4);
        assert!(accumulate(&parcels(), &months, 20.0).is_err());
    }

    #[test]
    fn test_duplicate_month_rejected() {
        let state = SeriesState::empty(&parcels());
        let m = stats(date(2020, 1), &[(0, "a", Some(0.1))]);
        let state = fold_step(state, &m).unwrap();
        assert!(fold_step(state, &m).is_err());
    }

    #[test]
    fn test_absent_parcel_gets_missing() {
        let state = SeriesState::empty(&parcels());
        let m = stats(date(2020, 1), &[(0, "a", Some(0.7)), (7, "zzz", Some(0.1))]);
        let state = fold_step(state, &m).unwrap();
        assert_eq!(state.get("a").unwrap().values, vec![Some(0.7)]);
        assert_eq!(state.get("b").unwrap().values, vec![None]);
        assert!(state.get("zzz").is_none());
    }

    #[test]
    fn test_shared_parcel_id_keeps_separate_series() {
        // Two parts of one holding, same id, different ground
        let parcels: ParcelCollection = vec![
            Parcel::new("a", rect(0.0, 0.0, 20.0, 40.0)),
            Parcel::new("a", rect(20.0, 0.0, 40.0, 40.0)),
        ]
        .into_iter()
        .collect();
        let mut gradient = Raster::new(4, 4).with_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        for row in 0..4 {
            for col in 0..4 {
                gradient.set(row, col, col as f64 / 10.0).unwrap();
            }
        }
        let mut month = composite(2020, 1, None);
        month.ndvi = Some(gradient);

        let state = accumulate(&parcels, &[month], 10.0).unwrap();
        assert_eq!(state.parcel_count(), 2);
        let west = state.series(0).unwrap().values[0].unwrap();
        let east = state.series(1).unwrap().values[0].unwrap();
        assert!((west - 0.05).abs() < 1e-10);
        assert!((east - 0.25).abs() < 1e-10);
        assert_eq!(state.get("a"), state.series(0));
    }

    #[test]
    fn test_parallel_matches_fold() {
        let months = two_years();
        let sequential = accumulate(&parcels(), &months, 20.0).unwrap();

        let mut shuffled = months.clone();
        shuffled.reverse();
        shuffled.swap(0, 11);
        let parallel = accumulate_parallel(&parcels(), &shuffled, 20.0).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parcel_order_preserved() {
        let state = accumulate(&parcels(), &two_years()[..1], 20.0).unwrap();
        let ids: Vec<_> = state.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
