use std::collections::HashMap;
use std::fmt;

use polars::prelude::*;
use thiserror::Error;

use crate::countries::{ALIASES, COUNTRIES};
use crate::error::DashError;
use crate::schema::noc;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continent {
    Africa,
    Antarctica,
    Asia,
    Europe,
    NorthAmerica,
    Oceania,
    SouthAmerica,
}

impl Continent {
    pub fn name(self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Antarctica => "Antarctica",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::Oceania => "Oceania",
            Continent::SouthAmerica => "South America",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Unrecognised country name: {0}")]
    UnknownCountry(String),

    #[error("No continent for territory: {0}")]
    NoContinent(String),

    #[error("{0}")]
    Other(String),
}

/// Maps a country display name to its continent.
pub trait ContinentClassifier {
    fn classify(&self, country: &str) -> Result<Continent, ClassifyError>;
}

impl<F> ContinentClassifier for F
where
    F: Fn(&str) -> Result<Continent, ClassifyError>,
{
    fn classify(&self, country: &str) -> Result<Continent, ClassifyError> {
        self(country)
    }
}

/// Classifier backed by the built-in ISO 3166 country list, extended with
/// the names national committees commonly go by.
pub struct CountryTable {
    by_name: HashMap<String, Option<Continent>>,
}

impl CountryTable {
    pub fn new() -> Self {
        let mut by_name = HashMap::with_capacity(COUNTRIES.len() * 2 + ALIASES.len());
        let mut by_code: HashMap<&str, Option<Continent>> = HashMap::new();

        for &(code, name, continent) in COUNTRIES {
            by_code.insert(code, continent);
            by_name.insert(normalize(name), continent);
            by_name.insert(normalize(code), continent);
        }
        for &(alias, code) in ALIASES {
            if let Some(continent) = by_code.get(code) {
                by_name.insert(normalize(alias), *continent);
            }
        }

        Self { by_name }
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinentClassifier for CountryTable {
    fn classify(&self, country: &str) -> Result<Continent, ClassifyError> {
        match self.by_name.get(&normalize(country)) {
            Some(Some(continent)) => Ok(*continent),
            Some(None) => Err(ClassifyError::NoContinent(country.to_string())),
            None => Err(ClassifyError::UnknownCountry(country.to_string())),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '\'' | '’' | '(' | ')'))
        .map(|c| if c == '-' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Add a `Continent` column to the NOC table.
///
/// Every row keeps its place; countries the classifier rejects, and rows
/// with no country, are labelled `Unknown`. A table without a `country`
/// column is returned as is.
pub fn enrich(nocs: &Table, classifier: &dyn ContinentClassifier) -> Table {
    match try_enrich(nocs, classifier) {
        Ok(table) => table,
        Err(err) => {
            tracing::warn!("Continent enrichment skipped: {err}");
            nocs.clone()
        }
    }
}

fn try_enrich(nocs: &Table, classifier: &dyn ContinentClassifier) -> Result<Table, DashError> {
    if !nocs.has_column(noc::COUNTRY) {
        if !nocs.is_empty() {
            tracing::warn!("NOC table has no '{}' column; continents unavailable", noc::COUNTRY);
        }
        return Ok(nocs.clone());
    }

    let mut cache: HashMap<String, &'static str> = HashMap::new();
    let mut unknown = 0usize;
    let labels: Vec<&str> = nocs
        .string_values(noc::COUNTRY)?
        .into_iter()
        .map(|name| {
            let label = match name {
                Some(name) => *cache.entry(name).or_insert_with_key(|name| {
                    match classifier.classify(name) {
                        Ok(continent) => continent.name(),
                        Err(err) => {
                            tracing::trace!("{err}");
                            noc::UNKNOWN_CONTINENT
                        }
                    }
                }),
                None => noc::UNKNOWN_CONTINENT,
            };
            if label == noc::UNKNOWN_CONTINENT {
                unknown += 1;
            }
            label
        })
        .collect();

    tracing::debug!(
        rows = labels.len(),
        unknown,
        "Classified NOC countries by continent"
    );

    let mut frame = nocs.frame().clone();
    frame.with_column(Series::new(noc::CONTINENT.into(), labels))?;
    Ok(nocs.with_frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_knows_names_aliases_and_codes() {
        let table = CountryTable::new();
        assert_eq!(table.classify("France"), Ok(Continent::Europe));
        assert_eq!(table.classify("  united states "), Ok(Continent::NorthAmerica));
        assert_eq!(table.classify("Great Britain"), Ok(Continent::Europe));
        assert_eq!(table.classify("Côte d'Ivoire"), Ok(Continent::Africa));
        assert_eq!(table.classify("BR"), Ok(Continent::SouthAmerica));
        assert_eq!(table.classify("Australia"), Ok(Continent::Oceania));
    }

    #[test]
    fn builtin_table_rejects_unknown_names() {
        let table = CountryTable::new();
        assert_eq!(
            table.classify("Refugee Olympic Team"),
            Err(ClassifyError::UnknownCountry("Refugee Olympic Team".into()))
        );
    }

    #[test]
    fn enrich_labels_every_row_and_never_drops() {
        let nocs = Table::new(
            "nocs",
            df!(
                "code" => ["FRA", "EOR", "KEN"],
                "country" => [Some("France"), Some("Refugee Olympic Team"), None],
            )
            .unwrap(),
        );
        let enriched = enrich(&nocs, &CountryTable::new());
        assert_eq!(enriched.height(), 3);
        assert_eq!(
            enriched.string_values("Continent").unwrap(),
            vec![
                Some("Europe".to_string()),
                Some("Unknown".to_string()),
                Some("Unknown".to_string())
            ]
        );
    }

    #[test]
    fn failing_classifier_yields_unknown() {
        let nocs = Table::new("nocs", df!("country" => ["France", "Kenya"]).unwrap());
        let broken = |name: &str| -> Result<Continent, ClassifyError> {
            if name == "Kenya" {
                Ok(Continent::Africa)
            } else {
                Err(ClassifyError::Other("lookup service down".into()))
            }
        };
        let enriched = enrich(&nocs, &broken);
        assert_eq!(
            enriched.string_values("Continent").unwrap(),
            vec![Some("Unknown".to_string()), Some("Africa".to_string())]
        );
    }

    #[test]
    fn enrich_leaves_tables_without_country_alone() {
        let empty = Table::empty("nocs");
        let enriched = enrich(&empty, &CountryTable::new());
        assert!(enriched.is_empty());
        assert!(!enriched.has_column("Continent"));
    }
}
