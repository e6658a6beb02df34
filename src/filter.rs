use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::DashError;
use crate::schema::{medal, noc};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MedalType {
    Gold,
    Silver,
    Bronze,
}

impl MedalType {
    pub const ALL: [MedalType; 3] = [MedalType::Gold, MedalType::Silver, MedalType::Bronze];

    pub fn label(self) -> &'static str {
        match self {
            MedalType::Gold => "Gold",
            MedalType::Silver => "Silver",
            MedalType::Bronze => "Bronze",
        }
    }

    /// Name of the per-country count column, also the value used by
    /// categorical `medal_type` columns.
    pub fn count_column(self) -> &'static str {
        match self {
            MedalType::Gold => medal::GOLD_MEDAL,
            MedalType::Silver => medal::SILVER_MEDAL,
            MedalType::Bronze => medal::BRONZE_MEDAL,
        }
    }
}

impl fmt::Display for MedalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MedalType {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MedalType::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()) || m.count_column() == s.trim())
            .ok_or_else(|| {
                DashError::InvalidData(format!(
                    "Invalid medal type: '{s}'. Must be 'Gold', 'Silver' or 'Bronze'"
                ))
            })
    }
}

/// What the user picked in the filter widgets for one interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub continents: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub sports: BTreeSet<String>,
    pub medal_types: BTreeSet<MedalType>,
}

impl Default for FilterSelection {
    /// Nothing narrowed, every medal type ticked.
    fn default() -> Self {
        Self {
            continents: BTreeSet::new(),
            countries: BTreeSet::new(),
            sports: BTreeSet::new(),
            medal_types: MedalType::ALL.into_iter().collect(),
        }
    }
}

impl FilterSelection {
    pub fn with_continents<I, S>(mut self, continents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.continents = continents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sports<I, S>(mut self, sports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sports = sports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_medal_types(mut self, medal_types: impl IntoIterator<Item = MedalType>) -> Self {
        self.medal_types = medal_types.into_iter().collect();
        self
    }
}

/// Countries a selection narrows the data to.
///
/// An empty set places no restriction on country; it never means
/// "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveCountries(BTreeSet<String>);

impl EffectiveCountries {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, country: &str) -> bool {
        self.0.contains(country)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl FromIterator<String> for EffectiveCountries {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolve the countries a selection implies.
///
/// Explicit countries win outright; otherwise every NOC country on a
/// selected continent; otherwise no restriction.
pub fn resolve(selection: &FilterSelection, nocs: &Table) -> EffectiveCountries {
    if !selection.countries.is_empty() {
        return selection.countries.iter().cloned().collect();
    }
    if selection.continents.is_empty() {
        return EffectiveCountries::unrestricted();
    }
    match countries_on_continents(nocs, &selection.continents) {
        Ok(countries) => countries,
        Err(err) => {
            tracing::warn!("Cannot resolve continents against NOC table: {err}");
            EffectiveCountries::unrestricted()
        }
    }
}

fn countries_on_continents(
    nocs: &Table,
    continents: &BTreeSet<String>,
) -> Result<EffectiveCountries, DashError> {
    if !nocs.has_column(noc::COUNTRY) || !nocs.has_column(noc::CONTINENT) {
        return Ok(EffectiveCountries::unrestricted());
    }
    let names = nocs.string_values(noc::COUNTRY)?;
    let labels = nocs.string_values(noc::CONTINENT)?;

    Ok(names
        .into_iter()
        .zip(labels)
        .filter_map(|(name, label)| match (name, label) {
            (Some(name), Some(label)) if continents.contains(&label) => Some(name),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn nocs() -> Table {
        Table::new(
            "nocs",
            df!(
                "code" => ["USA", "FRA", "GER", "KEN", "XYZ"],
                "country" => ["United States", "France", "Germany", "Kenya", "Atlantis"],
                "Continent" => ["North America", "Europe", "Europe", "Africa", "Unknown"],
            )
            .unwrap(),
        )
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn countries_override_continents() {
        let selection = FilterSelection::default()
            .with_continents(["Africa"])
            .with_countries(["France", "Narnia"]);
        let resolved = resolve(&selection, &nocs());
        assert_eq!(resolved.as_set(), &set(&["France", "Narnia"]));
    }

    #[test]
    fn continents_expand_to_noc_countries() {
        let selection = FilterSelection::default().with_continents(["Europe", "Africa"]);
        let resolved = resolve(&selection, &nocs());
        assert_eq!(resolved.as_set(), &set(&["France", "Germany", "Kenya"]));
    }

    #[test]
    fn nothing_selected_is_unrestricted() {
        let resolved = resolve(&FilterSelection::default(), &nocs());
        assert!(resolved.is_unrestricted());
    }

    #[test]
    fn continents_without_noc_table_are_unrestricted() {
        let selection = FilterSelection::default().with_continents(["Europe"]);
        let resolved = resolve(&selection, &Table::empty("nocs"));
        assert!(resolved.is_unrestricted());
    }

    #[test]
    fn medal_type_parses_labels_and_column_names() {
        assert_eq!("gold".parse::<MedalType>().unwrap(), MedalType::Gold);
        assert_eq!("Bronze Medal".parse::<MedalType>().unwrap(), MedalType::Bronze);
        assert!("Platinum".parse::<MedalType>().is_err());
    }

    #[test]
    fn default_selection_ticks_every_medal() {
        let selection = FilterSelection::default();
        assert_eq!(selection.medal_types.len(), 3);
        assert!(selection.countries.is_empty());
    }
}
