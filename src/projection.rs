use std::collections::{BTreeSet, HashMap};

use polars::prelude::*;

use crate::error::DashError;
use crate::filter::{self, EffectiveCountries, FilterSelection, MedalType};
use crate::schema::{country, noc};
use crate::table::Table;

/// The resolved filter set every page projects its tables through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilter {
    pub countries: EffectiveCountries,
    pub sports: BTreeSet<String>,
    pub medal_types: BTreeSet<MedalType>,
}

impl Default for ActiveFilter {
    fn default() -> Self {
        Self {
            countries: EffectiveCountries::unrestricted(),
            sports: BTreeSet::new(),
            medal_types: MedalType::ALL.into_iter().collect(),
        }
    }
}

impl ActiveFilter {
    pub fn resolve(selection: &FilterSelection, nocs: &Table) -> Self {
        Self {
            countries: filter::resolve(selection, nocs),
            sports: selection.sports.clone(),
            medal_types: selection.medal_types.clone(),
        }
    }
}

/// Filter a table down to the rows matching the active filter.
///
/// Each predicate applies only when the table carries the column it needs;
/// the rest are skipped. An unrestricted country set or an empty sport set
/// filters nothing on that dimension. Categorical medal-type columns keep
/// only the selected types. Columns are never altered.
pub fn project(table: &Table, filter: &ActiveFilter) -> Result<Table, DashError> {
    let roles = table.roles();
    let mut predicates: Vec<Expr> = Vec::new();

    if !filter.countries.is_unrestricted() {
        if let Some(column) = &roles.country {
            predicates.push(member_of(column, filter.countries.iter()));
        }
    }

    if !filter.sports.is_empty() {
        if let Some(column) = &roles.sport {
            predicates.push(member_of(column, filter.sports.iter().map(String::as_str)));
        }
    }

    if let Some(column) = &roles.medal_type {
        predicates.push(member_of(
            column,
            filter.medal_types.iter().map(|m| m.count_column()),
        ));
    }

    let Some(predicate) = predicates.into_iter().reduce(|acc, p| acc.and(p)) else {
        return Ok(table.clone());
    };

    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(predicate)
        .collect()?;

    Ok(table.with_frame(frame))
}

fn member_of<'a>(column: &str, values: impl Iterator<Item = &'a str>) -> Expr {
    let values: Vec<&str> = values.collect();
    let values = Series::new("values".into(), values);
    col(column).cast(DataType::String).is_in(lit(values), false)
}

/// Left-join the NOC continent onto a table.
///
/// Matches `country` to the NOC `country`, otherwise `country_code` to the
/// NOC `code`. Unmatched rows keep every field with a null continent. A
/// table already carrying a continent, or sharing no key with the NOC
/// table, is returned unchanged.
pub fn attach_continent(table: &Table, nocs: &Table) -> Result<Table, DashError> {
    if table.has_column(noc::CONTINENT) || !nocs.has_column(noc::CONTINENT) {
        return Ok(table.clone());
    }

    let key = if table.has_column(country::COUNTRY) && nocs.has_column(noc::COUNTRY) {
        Some((country::COUNTRY, noc::COUNTRY))
    } else if table.has_column(country::COUNTRY_CODE) && nocs.has_column(noc::CODE) {
        Some((country::COUNTRY_CODE, noc::CODE))
    } else {
        None
    };
    let Some((left_key, right_key)) = key else {
        tracing::debug!(
            table = table.name(),
            "No key shared with the NOC table; continent not attached"
        );
        return Ok(table.clone());
    };

    // First NOC row wins for duplicated keys, so the join never fans out.
    let mut lookup: HashMap<String, Option<String>> = HashMap::new();
    for (k, continent) in nocs
        .string_values(right_key)?
        .into_iter()
        .zip(nocs.string_values(noc::CONTINENT)?)
    {
        if let Some(k) = k {
            lookup.entry(k).or_insert(continent);
        }
    }

    let continents: Vec<Option<String>> = table
        .string_values(left_key)?
        .into_iter()
        .map(|k| k.and_then(|k| lookup.get(&k).cloned().flatten()))
        .collect();

    let mut frame = table.frame().clone();
    frame.with_column(Series::new(noc::CONTINENT.into(), continents))?;
    Ok(table.with_frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn medals_total() -> Table {
        Table::new(
            "medals_total",
            df!(
                "country_code" => ["USA", "FRA", "CHN"],
                "country" => ["United States", "France", "China"],
                "Gold Medal" => [40i64, 16, 40],
                "Silver Medal" => [44i64, 26, 27],
                "Bronze Medal" => [42i64, 22, 24],
            )
            .unwrap(),
        )
    }

    fn nocs() -> Table {
        Table::new(
            "nocs",
            df!(
                "code" => ["USA", "FRA"],
                "country" => ["United States", "France"],
                "Continent" => ["North America", "Europe"],
            )
            .unwrap(),
        )
    }

    fn filter_for(countries: &[&str]) -> ActiveFilter {
        ActiveFilter {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            ..ActiveFilter::default()
        }
    }

    #[test]
    fn unrestricted_projection_keeps_every_row() {
        let projected = project(&medals_total(), &ActiveFilter::default()).unwrap();
        assert_eq!(projected.height(), 3);
    }

    #[test]
    fn country_projection_keeps_matching_rows_in_order() {
        let projected = project(&medals_total(), &filter_for(&["China", "France"])).unwrap();
        assert_eq!(
            projected.string_values("country").unwrap(),
            vec![Some("France".to_string()), Some("China".to_string())]
        );
        assert_eq!(projected.frame().width(), medals_total().frame().width());
    }

    #[test]
    fn table_without_country_column_is_untouched() {
        let events = Table::new(
            "events",
            df!("event" => ["100m", "Marathon"], "sport" => ["Athletics", "Athletics"]).unwrap(),
        );
        let projected = project(&events, &filter_for(&["France"])).unwrap();
        assert_eq!(projected.frame(), events.frame());
    }

    #[test]
    fn noc_column_is_used_when_country_is_absent() {
        let athletes = Table::new(
            "athletes",
            df!("name" => ["A", "B"], "noc" => ["France", "Kenya"]).unwrap(),
        );
        let projected = project(&athletes, &filter_for(&["Kenya"])).unwrap();
        assert_eq!(
            projected.string_values("name").unwrap(),
            vec![Some("B".to_string())]
        );
    }

    #[test]
    fn sport_projection_falls_back_to_discipline() {
        let medals = Table::new(
            "medals",
            df!(
                "name" => ["A", "B", "C"],
                "discipline" => ["Judo", "Swimming", "Judo"],
            )
            .unwrap(),
        );
        let filter = ActiveFilter {
            sports: ["Judo".to_string()].into_iter().collect(),
            ..ActiveFilter::default()
        };
        let projected = project(&medals, &filter).unwrap();
        assert_eq!(projected.height(), 2);
    }

    #[test]
    fn categorical_medal_type_keeps_selected_types() {
        let medals = Table::new(
            "medals",
            df!(
                "name" => ["A", "B", "C"],
                "medal_type" => ["Gold Medal", "Silver Medal", "Bronze Medal"],
            )
            .unwrap(),
        );
        let filter = ActiveFilter {
            medal_types: [MedalType::Gold, MedalType::Bronze].into_iter().collect(),
            ..ActiveFilter::default()
        };
        let projected = project(&medals, &filter).unwrap();
        assert_eq!(
            projected.string_values("name").unwrap(),
            vec![Some("A".to_string()), Some("C".to_string())]
        );
    }

    #[test]
    fn predicates_are_conjunctive() {
        let medals = Table::new(
            "medals",
            df!(
                "country" => ["France", "France", "Kenya"],
                "discipline" => ["Judo", "Swimming", "Judo"],
                "medal_type" => ["Gold Medal", "Gold Medal", "Gold Medal"],
            )
            .unwrap(),
        );
        let filter = ActiveFilter {
            countries: ["France".to_string()].into_iter().collect(),
            sports: ["Judo".to_string()].into_iter().collect(),
            medal_types: [MedalType::Gold].into_iter().collect(),
        };
        assert_eq!(project(&medals, &filter).unwrap().height(), 1);
    }

    #[test]
    fn continent_attached_by_country_name() {
        let joined = attach_continent(&medals_total(), &nocs()).unwrap();
        assert_eq!(joined.height(), 3);
        assert_eq!(
            joined.string_values("Continent").unwrap(),
            vec![
                Some("North America".to_string()),
                Some("Europe".to_string()),
                None
            ]
        );
    }

    #[test]
    fn continent_attached_by_code_when_names_missing() {
        let medals = Table::new(
            "medals",
            df!("country_code" => ["FRA", "ZZZ"], "discipline" => ["Judo", "Judo"]).unwrap(),
        );
        let joined = attach_continent(&medals, &nocs()).unwrap();
        assert_eq!(
            joined.string_values("Continent").unwrap(),
            vec![Some("Europe".to_string()), None]
        );
    }
}
