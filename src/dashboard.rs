use crate::config::DashboardConfig;
use crate::error::DashError;
use crate::filter::{FilterSelection, MedalType};
use crate::geography::{self, ContinentClassifier, CountryTable};
use crate::projection::ActiveFilter;
use crate::schema::{noc, sport};
use crate::store::{Dataset, TableStore};
use crate::table::Table;

/// Session context: the loaded tables and the continent-enriched NOC table.
///
/// Built once per session and read-only afterwards; every page pipeline
/// borrows it.
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: DashboardConfig,
    store: TableStore,
    nocs: Table,
}

/// Values the filter widgets may offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub continents: Vec<String>,
    /// Narrowed to the selected continents when any are selected.
    pub countries: Vec<String>,
    pub sports: Vec<String>,
    pub medal_types: Vec<MedalType>,
}

impl Dashboard {
    /// Load every dataset from `config.data_dir` and classify NOC countries
    /// with the built-in country table.
    pub fn open(config: DashboardConfig) -> Self {
        Self::open_with(config, &CountryTable::new())
    }

    pub fn open_with(config: DashboardConfig, classifier: &dyn ContinentClassifier) -> Self {
        let store = TableStore::load(&config.data_dir);
        Self::from_store(config, store, classifier)
    }

    pub fn from_store(
        config: DashboardConfig,
        store: TableStore,
        classifier: &dyn ContinentClassifier,
    ) -> Self {
        let nocs = geography::enrich(store.get(Dataset::Nocs), classifier);
        Self {
            config,
            store,
            nocs,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// The NOC table with its `Continent` column.
    pub fn nocs(&self) -> &Table {
        &self.nocs
    }

    /// A dataset as pages see it; NOCs come back enriched.
    pub fn table(&self, dataset: Dataset) -> &Table {
        match dataset {
            Dataset::Nocs => &self.nocs,
            other => self.store.get(other),
        }
    }

    pub fn active_filter(&self, selection: &FilterSelection) -> ActiveFilter {
        ActiveFilter::resolve(selection, &self.nocs)
    }

    pub fn filter_options(&self, selection: &FilterSelection) -> Result<FilterOptions, DashError> {
        let continents = self.nocs.distinct_values(noc::CONTINENT)?;

        let countries = if selection.continents.is_empty() || !self.nocs.has_column(noc::CONTINENT)
        {
            self.nocs.distinct_values(noc::COUNTRY)?
        } else if self.nocs.has_column(noc::COUNTRY) {
            let mut names: Vec<String> = self
                .nocs
                .string_values(noc::COUNTRY)?
                .into_iter()
                .zip(self.nocs.string_values(noc::CONTINENT)?)
                .filter_map(|(name, continent)| match (name, continent) {
                    (Some(name), Some(c)) if selection.continents.contains(&c) => Some(name),
                    _ => None,
                })
                .collect();
            names.sort();
            names.dedup();
            names
        } else {
            Vec::new()
        };

        let sports = self.store.get(Dataset::Events).distinct_values(sport::SPORT)?;

        Ok(FilterOptions {
            continents,
            countries,
            sports,
            medal_types: MedalType::ALL.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn dashboard() -> Dashboard {
        let store = TableStore::from_frames([
            (
                Dataset::Nocs,
                df!(
                    "code" => ["FRA", "GER", "KEN", "EOR"],
                    "country" => ["France", "Germany", "Kenya", "Refugee Olympic Team"],
                )
                .unwrap(),
            ),
            (
                Dataset::Events,
                df!("event" => ["100m", "Final", "Heat"], "sport" => ["Athletics", "Judo", "Athletics"])
                    .unwrap(),
            ),
        ])
        .unwrap();
        Dashboard::from_store(DashboardConfig::default(), store, &CountryTable::new())
    }

    #[test]
    fn nocs_are_enriched_once() {
        let dash = dashboard();
        assert_eq!(
            dash.table(Dataset::Nocs).string_values("Continent").unwrap(),
            vec![
                Some("Europe".to_string()),
                Some("Europe".to_string()),
                Some("Africa".to_string()),
                Some("Unknown".to_string())
            ]
        );
        assert!(!dash.store().get(Dataset::Nocs).has_column("Continent"));
    }

    #[test]
    fn filter_options_narrow_countries_by_continent() {
        let dash = dashboard();
        let all = dash.filter_options(&FilterSelection::default()).unwrap();
        assert_eq!(all.continents, vec!["Africa", "Europe", "Unknown"]);
        assert_eq!(all.countries.len(), 4);
        assert_eq!(all.sports, vec!["Athletics", "Judo"]);
        assert_eq!(all.medal_types, MedalType::ALL.to_vec());

        let europe = dash
            .filter_options(&FilterSelection::default().with_continents(["Europe"]))
            .unwrap();
        assert_eq!(europe.countries, vec!["France", "Germany"]);
    }

    #[test]
    fn active_filter_resolves_continents() {
        let dash = dashboard();
        let filter = dash.active_filter(&FilterSelection::default().with_continents(["Africa"]));
        assert_eq!(filter.countries.iter().collect::<Vec<_>>(), vec!["Kenya"]);
    }
}
