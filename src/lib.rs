//! Filter-driven analytics over the Paris 2024 result tables.
//!
//! A [`Dashboard`] loads every dataset once, enriches the NOC table with
//! continents, and answers per-page queries for a [`FilterSelection`].

pub mod aggregation;
pub mod config;
mod countries;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod geography;
pub mod logging;
pub mod pages;
pub mod projection;
pub mod schema;
pub mod store;
pub mod table;

#[cfg(feature = "python")]
mod python;

pub use aggregation::Aggregate;
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, FilterOptions};
pub use error::DashError;
pub use filter::{EffectiveCountries, FilterSelection, MedalType};
pub use geography::{Continent, ContinentClassifier, CountryTable};
pub use projection::ActiveFilter;
pub use store::{Dataset, LoadIssue, LoadReport, TableStore};
pub use table::{ColumnRoles, Table};
