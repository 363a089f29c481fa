//! Temporal compositing
//!
//! - Annual baselines: one low-vegetation mask per year, from a fixed
//!   reference window inside that year
//! - Monthly composites: mean NDVI per calendar month, masked by the
//!   baseline of the month's year

mod baseline;
mod monthly;

pub use baseline::{annual_baseline, AnnualBaseline, AnnualBaselines, BaselineParams};
pub use monthly::{monthly_composite, monthly_composites, MonthlyComposite};
