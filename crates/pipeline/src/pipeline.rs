//! Pipeline assembly and evaluation
//!
//! The run is expressed as an explicit [`TaskGraph`]:
//!
//! - `selection`: reference lookup, distance/type join, dissolve
//! - `baseline_{year}`: one per year, after the selection
//! - `composite_{year}_{month}`: one per month, after the selection and the
//!   baseline of its own year
//! - `fold_init`, `fold_{year}_{month}`: the accumulator chain; each step
//!   needs the previous step and its month's composite
//! - `chart`: after every composite in the chart years
//!
//! Baselines share one wave and so do composites; the fold chain adds one
//! wave per folded month and is the sequential part of the run.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use tracing::{debug, info, warn};
use vegtrend_algorithms::compositing::{
    annual_baseline, monthly_composite, AnnualBaseline, AnnualBaselines, MonthlyComposite,
};
use vegtrend_algorithms::imagery::ImagerySource;
use vegtrend_algorithms::statistics::zonal_statistics;
use vegtrend_algorithms::timeseries::{fold_step, SeriesState};
use vegtrend_algorithms::vector::{select_parcels, Selection};
use vegtrend_core::time::monthly_windows;
use vegtrend_core::vector::{Parcel, ParcelCollection};
use vegtrend_core::Error;
use vegtrend_parallel::{NodeId, TaskGraph};

use crate::chart::{chart_series, ChartSeries};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Output of one graph node
#[derive(Debug)]
enum Stage {
    Selection(Selection),
    Baseline(AnnualBaseline),
    Composite(MonthlyComposite),
    Fold(SeriesState),
    Chart(ChartSeries),
}

impl Stage {
    fn selection(&self) -> Result<&Selection> {
        match self {
            Stage::Selection(s) => Ok(s),
            _ => Err(PipelineError::UnexpectedOutput("selection".to_string())),
        }
    }

    fn baseline(&self) -> Result<&AnnualBaseline> {
        match self {
            Stage::Baseline(b) => Ok(b),
            _ => Err(PipelineError::UnexpectedOutput("baseline".to_string())),
        }
    }

    fn composite(&self) -> Result<&MonthlyComposite> {
        match self {
            Stage::Composite(c) => Ok(c),
            _ => Err(PipelineError::UnexpectedOutput("composite".to_string())),
        }
    }

    fn fold(&self) -> Result<&SeriesState> {
        match self {
            Stage::Fold(s) => Ok(s),
            _ => Err(PipelineError::UnexpectedOutput("fold".to_string())),
        }
    }
}

/// Progress of the accumulator chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldProgress {
    pub year: i32,
    pub month: u32,
    /// Months folded so far, this one included
    pub done: usize,
    pub total: usize,
}

type ProgressFn<'a> = Box<dyn Fn(FoldProgress) + Send + Sync + 'a>;

/// Everything a run produces
#[derive(Debug)]
pub struct PipelineOutput {
    pub reference: Parcel,
    pub selection: Selection,
    pub baselines: AnnualBaselines,
    /// Monthly composites in chronological order
    pub composites: Vec<MonthlyComposite>,
    /// Per-parcel series over the fold years
    pub series: SeriesState,
    pub chart: ChartSeries,
}

/// First parcel whose id attribute equals the configured reference id
pub fn find_reference<'p>(universe: &'p ParcelCollection, config: &PipelineConfig) -> Result<&'p Parcel> {
    universe
        .find_by_property(&config.parcel_id_field, &config.reference_parcel_id)
        .ok_or_else(|| PipelineError::ReferenceNotFound {
            field: config.parcel_id_field.clone(),
            id: config.reference_parcel_id.clone(),
        })
}

/// Spatial selection around `reference`
fn select_around(reference: &Parcel, universe: &ParcelCollection, config: &PipelineConfig) -> Selection {
    let selection = select_parcels(reference.geometry(), universe, &config.selection_params());
    info!(
        reference = reference.id(),
        selected = selection.parcels.len(),
        candidates = universe.len(),
        "Selected parcels within {} units",
        config.distance_threshold
    );
    if selection.is_empty() {
        warn!("No parcel selected; every imagery query will come back empty");
    }
    selection
}

/// Reference lookup followed by the spatial selection around it
pub fn select(universe: &ParcelCollection, config: &PipelineConfig) -> Result<(Parcel, Selection)> {
    let reference = find_reference(universe, config)?;
    let selection = select_around(reference, universe, config);
    Ok((reference.clone(), selection))
}

/// A configured pipeline over one parcel universe and one imagery source
pub struct Pipeline<'a> {
    config: PipelineConfig,
    source: &'a dyn ImagerySource,
    universe: &'a ParcelCollection,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: PipelineConfig,
        source: &'a dyn ImagerySource,
        universe: &'a ParcelCollection,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            universe,
            progress: None,
        })
    }

    /// Call `f` after each month folded into the series
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(FoldProgress) + Send + Sync + 'a,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Months folded into the parcel series
    pub fn fold_month_count(&self) -> Result<usize> {
        let (first, end) = self.config.monthly_span()?;
        Ok(monthly_windows(first, end)?
            .iter()
            .filter(|w| self.config.fold_range().contains(&w.year()))
            .count())
    }

    /// Build the dependency graph of the run
    fn build_graph<'g>(&'g self, reference: &'g Parcel) -> Result<Graph<'g>> {
        let config = &self.config;
        let source = self.source;
        let universe = self.universe;
        let compositor = config.compositor()?;
        let params = config.baseline_params();
        let mut graph: TaskGraph<'g, Stage, PipelineError> = TaskGraph::new();

        let selection = graph.add_node("selection", &[], move |_| {
            Ok(Stage::Selection(select_around(reference, universe, config)))
        })?;

        let mut baselines: BTreeMap<i32, NodeId> = BTreeMap::new();
        for year in config.baseline_years() {
            let compositor = compositor.clone();
            let id = graph.add_node(format!("baseline_{year}"), &[selection], move |inputs| {
                let region = &inputs[0].selection()?.region;
                let baseline = annual_baseline(source, &compositor, region, year, &params)?;
                info!(
                    year,
                    images = baseline.image_count,
                    flagged = baseline.flagged_count(),
                    "Annual low-vegetation mask"
                );
                Ok(Stage::Baseline(baseline))
            })?;
            baselines.insert(year, id);
        }

        let (first, end) = config.monthly_span()?;
        let mut composites = Vec::new();
        for window in monthly_windows(first, end)? {
            let year = window.year();
            let month = window.month_of_year();
            let baseline = *baselines.get(&year).ok_or_else(|| Error::InvalidParameter {
                name: "year",
                value: year.to_string(),
                reason: "no annual baseline for this year".to_string(),
            })?;
            let compositor = compositor.clone();
            let id = graph.add_node(
                format!("composite_{year}_{month}"),
                &[selection, baseline],
                move |inputs| {
                    let region: &MultiPolygon<f64> = &inputs[0].selection()?.region;
                    let baseline = inputs[1].baseline()?;
                    let composite = monthly_composite(source, &compositor, region, &window, baseline)?;
                    debug!(
                        year,
                        month,
                        images = composite.image_count,
                        dropped = composite.report.unmatched,
                        valid = composite.valid_count(),
                        "Monthly composite"
                    );
                    Ok(Stage::Composite(composite))
                },
            )?;
            composites.push((year, month, id));
        }

        let fold_months: Vec<_> = composites
            .iter()
            .filter(|(year, _, _)| config.fold_range().contains(year))
            .copied()
            .collect();
        let total = fold_months.len();
        let progress = self.progress.as_ref();
        let scale = config.parcel_scale;

        let mut fold = graph.add_node("fold_init", &[selection], |inputs| {
            Ok(Stage::Fold(SeriesState::empty(&inputs[0].selection()?.parcels)))
        })?;
        for (done, (year, month, composite)) in fold_months.into_iter().enumerate() {
            fold = graph.add_node(
                format!("fold_{year}_{month}"),
                &[fold, composite, selection],
                move |inputs| {
                    let state = inputs[0].fold()?.clone();
                    let composite = inputs[1].composite()?;
                    let parcels = &inputs[2].selection()?.parcels;
                    let stats = zonal_statistics(composite, parcels, scale)?;
                    let state = fold_step(state, &stats)?;
                    debug!(property = %stats.property, "Folded month into parcel series");
                    if let Some(report) = progress {
                        report(FoldProgress {
                            year,
                            month,
                            done: done + 1,
                            total,
                        });
                    }
                    Ok(Stage::Fold(state))
                },
            )?;
        }

        let mut chart_deps = vec![selection];
        chart_deps.extend(
            composites
                .iter()
                .filter(|(year, _, _)| config.chart_range().contains(year))
                .map(|&(_, _, id)| id),
        );
        let chart_scale = config.chart_scale;
        let chart = graph.add_node("chart", &chart_deps, move |inputs| {
            let parcels = &inputs[0].selection()?.parcels;
            let months = inputs[1..]
                .iter()
                .map(|s| s.composite())
                .collect::<Result<Vec<_>>>()?;
            Ok(Stage::Chart(chart_series(&months, parcels, chart_scale)?))
        })?;

        Ok(Graph {
            graph,
            selection,
            baselines: baselines.into_values().collect(),
            composites: composites.into_iter().map(|(_, _, id)| id).collect(),
            fold,
            chart,
        })
    }

    /// Run the whole pipeline
    pub fn run(&self) -> Result<PipelineOutput> {
        let reference = find_reference(self.universe, &self.config)?;
        info!(
            reference = reference.id(),
            years = ?self.config.years,
            fold_years = ?self.config.fold_years,
            mode = ?self.config.processing,
            "Starting parcel NDVI pipeline"
        );

        let nodes = self.build_graph(reference)?;
        let waves = nodes.graph.waves().len();
        debug!(nodes = nodes.graph.len(), waves, "Task graph assembled");

        let mut eval = nodes.graph.evaluate(self.config.processing)?;
        let mut take = |id: NodeId| {
            eval.take(id).ok_or_else(|| {
                PipelineError::UnexpectedOutput(nodes.graph.name(id).unwrap_or("?").to_string())
            })
        };

        let Stage::Selection(selection) = take(nodes.selection)? else {
            return Err(PipelineError::UnexpectedOutput("selection".to_string()));
        };
        let mut baselines = AnnualBaselines::new();
        for id in &nodes.baselines {
            match take(*id)? {
                Stage::Baseline(b) => baselines.insert(b),
                _ => return Err(PipelineError::UnexpectedOutput("baseline".to_string())),
            }
        }
        let mut composites = Vec::with_capacity(nodes.composites.len());
        for id in &nodes.composites {
            match take(*id)? {
                Stage::Composite(c) => composites.push(c),
                _ => return Err(PipelineError::UnexpectedOutput("composite".to_string())),
            }
        }
        let Stage::Fold(series) = take(nodes.fold)? else {
            return Err(PipelineError::UnexpectedOutput("fold".to_string()));
        };
        let Stage::Chart(chart) = take(nodes.chart)? else {
            return Err(PipelineError::UnexpectedOutput("chart".to_string()));
        };

        info!(
            parcels = series.parcel_count(),
            months = composites.len(),
            chart_points = chart.len(),
            "Pipeline finished"
        );
        Ok(PipelineOutput {
            reference: reference.clone(),
            selection,
            baselines,
            composites,
            series,
            chart,
        })
    }
}

/// Assembled graph and the ids of the nodes whose outputs are kept
struct Graph<'a> {
    graph: TaskGraph<'a, Stage, PipelineError>,
    selection: NodeId,
    baselines: Vec<NodeId>,
    composites: Vec<NodeId>,
    fold: NodeId,
    chart: NodeId,
}
