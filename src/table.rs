use std::collections::BTreeSet;

use polars::prelude::*;

use crate::error::DashError;
use crate::filter::MedalType;
use crate::schema::{country, medal, sport};

/// The columns a table filters and aggregates by, probed once when the
/// table is built so no caller has to re-check alias names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    /// `country`, else `noc`.
    pub country: Option<String>,
    /// `sport`, else `discipline`.
    pub sport: Option<String>,
    /// Categorical per-medal column (`medal_type`).
    pub medal_type: Option<String>,
    /// Medal-count columns present, in Gold, Silver, Bronze order.
    pub medal_counts: Vec<(MedalType, String)>,
}

impl ColumnRoles {
    pub fn resolve(frame: &DataFrame) -> Self {
        let names = frame.get_column_names_str();
        let has = |name: &str| names.iter().any(|n| *n == name);
        let first_of = |aliases: &[&str]| {
            aliases
                .iter()
                .find(|alias| has(alias))
                .map(|alias| alias.to_string())
        };

        Self {
            country: first_of(&country::ALIASES),
            sport: first_of(&sport::ALIASES),
            medal_type: has(medal::MEDAL_TYPE).then(|| medal::MEDAL_TYPE.to_string()),
            medal_counts: MedalType::ALL
                .iter()
                .filter(|m| has(m.count_column()))
                .map(|m| (*m, m.count_column().to_string()))
                .collect(),
        }
    }

    /// Count columns for the selected medal types, in Gold, Silver, Bronze order.
    pub fn selected_medal_columns(&self, selected: &BTreeSet<MedalType>) -> Vec<(MedalType, &str)> {
        self.medal_counts
            .iter()
            .filter(|(m, _)| selected.contains(m))
            .map(|(m, c)| (*m, c.as_str()))
            .collect()
    }
}

/// A named data frame together with its resolved column roles.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    frame: DataFrame,
    roles: ColumnRoles,
}

impl Table {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        let roles = ColumnRoles::resolve(&frame);
        Self {
            name: name.into(),
            frame,
            roles,
        }
    }

    /// A table with no rows and no guaranteed columns.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, DataFrame::empty())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Same table name, new contents; roles are re-resolved.
    pub(crate) fn with_frame(&self, frame: DataFrame) -> Self {
        Self::new(self.name.clone(), frame)
    }

    /// Column values rendered as strings, nulls kept as `None`.
    pub fn string_values(&self, column: &str) -> Result<Vec<Option<String>>, DashError> {
        let col = self.frame.column(column)?.cast(&DataType::String)?;
        Ok(col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }

    /// Column values as numbers; nulls and unparseable values are `None`.
    pub fn float_values(&self, column: &str) -> Result<Vec<Option<f64>>, DashError> {
        let col = self.frame.column(column)?.cast(&DataType::Float64)?;
        Ok(col.as_materialized_series().f64()?.into_iter().collect())
    }

    /// Column values as counts; nulls count as zero.
    pub fn count_values(&self, column: &str) -> Result<Vec<i64>, DashError> {
        Ok(self
            .float_values(column)?
            .into_iter()
            .map(|v| v.map(|f| f.round() as i64).unwrap_or(0))
            .collect())
    }

    /// Sorted distinct non-null values of a column; empty when the column is absent.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>, DashError> {
        if !self.has_column(column) {
            return Ok(Vec::new());
        }
        let values: BTreeSet<String> = self.string_values(column)?.into_iter().flatten().collect();
        Ok(values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roles_prefer_country_over_noc() {
        let df = df!(
            "noc" => ["USA"],
            "country" => ["United States"],
            "discipline" => ["Judo"],
        )
        .unwrap();
        let roles = ColumnRoles::resolve(&df);
        assert_eq!(roles.country.as_deref(), Some("country"));
        assert_eq!(roles.sport.as_deref(), Some("discipline"));
        assert_eq!(roles.medal_type, None);
    }

    #[test]
    fn roles_fall_back_to_noc() {
        let df = df!("noc" => ["USA"], "sport" => ["Judo"]).unwrap();
        let roles = ColumnRoles::resolve(&df);
        assert_eq!(roles.country.as_deref(), Some("noc"));
        assert_eq!(roles.sport.as_deref(), Some("sport"));
    }

    #[test]
    fn medal_columns_follow_selection_in_fixed_order() {
        let df = df!(
            "Bronze Medal" => [1i64],
            "Gold Medal" => [2i64],
        )
        .unwrap();
        let roles = ColumnRoles::resolve(&df);
        let selected: BTreeSet<MedalType> = MedalType::ALL.into_iter().collect();
        assert_eq!(
            roles.selected_medal_columns(&selected),
            vec![
                (MedalType::Gold, "Gold Medal"),
                (MedalType::Bronze, "Bronze Medal")
            ]
        );
    }

    #[test]
    fn empty_table_has_no_roles() {
        let table = Table::empty("venues");
        assert!(table.is_empty());
        assert_eq!(table.roles(), &ColumnRoles::default());
        assert_eq!(table.distinct_values("venue").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn count_values_treat_junk_as_zero() {
        let table = Table::new("t", df!("Total" => ["3", "", "x", "4.0"]).unwrap());
        assert_eq!(table.count_values("Total").unwrap(), vec![3, 0, 0, 4]);
    }
}
