use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::*;

use crate::error::DashError;
use crate::filter::MedalType;
use crate::schema::output;
use crate::table::Table;

/// Outcome of an aggregate.
///
/// `NoData` means the selection left nothing to show; `Unavailable` means
/// the table lacks what the aggregate needs. Neither is ever rendered as a
/// zero-valued chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate<T> {
    Ready(T),
    NoData,
    Unavailable(String),
}

impl<T> Aggregate<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Aggregate::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Aggregate::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Aggregate<&T> {
        match self {
            Aggregate::Ready(value) => Aggregate::Ready(value),
            Aggregate::NoData => Aggregate::NoData,
            Aggregate::Unavailable(why) => Aggregate::Unavailable(why.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        match self {
            Aggregate::Ready(value) => Aggregate::Ready(f(value)),
            Aggregate::NoData => Aggregate::NoData,
            Aggregate::Unavailable(why) => Aggregate::Unavailable(why),
        }
    }
}

fn missing_column(table: &Table, column: &str) -> String {
    format!("{} has no '{column}' column", table.name())
}

// ── Medal-type distribution ─────────────────────────────────────────────────

/// Total medals per selected medal type, in Gold, Silver, Bronze order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedalDistribution(pub Vec<(MedalType, i64)>);

impl MedalDistribution {
    pub fn get(&self, medal: MedalType) -> Option<i64> {
        self.0.iter().find(|(m, _)| *m == medal).map(|(_, n)| *n)
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|(_, n)| n).sum()
    }

    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        let labels: Vec<&str> = self.0.iter().map(|(m, _)| m.label()).collect();
        let counts: Vec<i64> = self.0.iter().map(|(_, n)| *n).collect();
        Ok(DataFrame::new(vec![
            Column::new(output::MEDAL_TYPE.into(), &labels),
            Column::new(output::COUNT.into(), &counts),
        ])?)
    }
}

/// Sum each selected medal-count column over every row.
pub fn medal_distribution(
    table: &Table,
    medal_types: &BTreeSet<MedalType>,
) -> Result<Aggregate<MedalDistribution>, DashError> {
    if table.roles().medal_counts.is_empty() {
        return Ok(Aggregate::Unavailable(format!(
            "{} has no medal count columns",
            table.name()
        )));
    }

    let mut counts = Vec::new();
    for (medal, column) in table.roles().selected_medal_columns(medal_types) {
        counts.push((medal, table.count_values(column)?.into_iter().sum()));
    }

    let distribution = MedalDistribution(counts);
    if distribution.0.is_empty() || distribution.total() <= 0 {
        return Ok(Aggregate::NoData);
    }
    Ok(Aggregate::Ready(distribution))
}

// ── Top-N by selected total ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub label: String,
    pub total: i64,
    /// Count per selected medal type, in Gold, Silver, Bronze order.
    pub breakdown: Vec<(MedalType, i64)>,
}

/// Rows labelled by `label_column`, each with the sum of its selected
/// medal-count columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub label_column: String,
    pub rows: Vec<RankedRow>,
}

impl Ranking {
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// `label_column` and `Selected Total`, one row per entry.
    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        let labels = self.labels();
        let totals: Vec<i64> = self.rows.iter().map(|r| r.total).collect();
        Ok(DataFrame::new(vec![
            Column::new(self.label_column.as_str().into(), &labels),
            Column::new(output::SELECTED_TOTAL.into(), &totals),
        ])?)
    }

    /// Long format: one row per (entry, medal type).
    pub fn breakdown_frame(&self) -> Result<DataFrame, DashError> {
        let mut labels: Vec<&str> = Vec::new();
        let mut medals: Vec<&str> = Vec::new();
        let mut counts: Vec<i64> = Vec::new();
        for row in &self.rows {
            for (medal, count) in &row.breakdown {
                labels.push(&row.label);
                medals.push(medal.label());
                counts.push(*count);
            }
        }
        Ok(DataFrame::new(vec![
            Column::new(self.label_column.as_str().into(), &labels),
            Column::new(output::MEDAL_TYPE.into(), &medals),
            Column::new(output::COUNT.into(), &counts),
        ])?)
    }
}

/// Every labelled row with its selected total, in table order. With no
/// medal type selected every total is zero.
pub fn selected_totals(
    table: &Table,
    medal_types: &BTreeSet<MedalType>,
    label_column: &str,
) -> Result<Aggregate<Ranking>, DashError> {
    if !table.has_column(label_column) {
        return Ok(Aggregate::Unavailable(missing_column(table, label_column)));
    }

    let columns = table.roles().selected_medal_columns(medal_types);
    let mut per_medal: Vec<(MedalType, Vec<i64>)> = Vec::with_capacity(columns.len());
    for (medal, column) in columns {
        per_medal.push((medal, table.count_values(column)?));
    }

    let rows: Vec<RankedRow> = table
        .string_values(label_column)?
        .into_iter()
        .enumerate()
        .filter_map(|(i, label)| {
            let label = label?;
            let breakdown: Vec<(MedalType, i64)> =
                per_medal.iter().map(|(m, values)| (*m, values[i])).collect();
            Some(RankedRow {
                label,
                total: breakdown.iter().map(|(_, n)| n).sum(),
                breakdown,
            })
        })
        .collect();

    if rows.is_empty() {
        return Ok(Aggregate::NoData);
    }
    Ok(Aggregate::Ready(Ranking {
        label_column: label_column.to_string(),
        rows,
    }))
}

/// The `n` rows with the highest selected total; ties keep table order.
pub fn top_n_by_total(
    table: &Table,
    medal_types: &BTreeSet<MedalType>,
    label_column: &str,
    n: usize,
) -> Result<Aggregate<Ranking>, DashError> {
    if table.roles().selected_medal_columns(medal_types).is_empty() {
        return Ok(Aggregate::NoData);
    }
    Ok(selected_totals(table, medal_types, label_column)?.map(|mut ranking| {
        // sort_by is stable
        ranking.rows.sort_by(|a, b| b.total.cmp(&a.total));
        ranking.rows.truncate(n);
        ranking
    }))
}

// ── Category counts ─────────────────────────────────────────────────────────

/// Rows per distinct value, most frequent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    pub column: String,
    pub rows: Vec<(String, u32)>,
}

impl CategoryCounts {
    pub fn get(&self, category: &str) -> Option<u32> {
        self.rows.iter().find(|(c, _)| c == category).map(|(_, n)| *n)
    }

    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        let categories: Vec<&str> = self.rows.iter().map(|(c, _)| c.as_str()).collect();
        let counts: Vec<u32> = self.rows.iter().map(|(_, n)| *n).collect();
        Ok(DataFrame::new(vec![
            Column::new(self.column.as_str().into(), &categories),
            Column::new(output::COUNT.into(), &counts),
        ])?)
    }
}

/// Count rows per distinct non-null value of `column`, descending by count,
/// ties in order of first appearance.
pub fn count_by(table: &Table, column: &str) -> Result<Aggregate<CategoryCounts>, DashError> {
    if !table.has_column(column) {
        return Ok(Aggregate::Unavailable(missing_column(table, column)));
    }

    let mut seen: HashMap<String, (usize, u32)> = HashMap::new();
    for (i, value) in table.string_values(column)?.into_iter().enumerate() {
        if let Some(value) = value {
            seen.entry(value).or_insert((i, 0)).1 += 1;
        }
    }
    if seen.is_empty() {
        return Ok(Aggregate::NoData);
    }

    let mut rows: Vec<(String, usize, u32)> = seen
        .into_iter()
        .map(|(value, (first, count))| (value, first, count))
        .collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    Ok(Aggregate::Ready(CategoryCounts {
        column: column.to_string(),
        rows: rows.into_iter().map(|(value, _, count)| (value, count)).collect(),
    }))
}

/// The `n` most frequent values of an entity key column.
pub fn rank_entities(
    table: &Table,
    key_column: &str,
    n: usize,
) -> Result<Aggregate<CategoryCounts>, DashError> {
    Ok(count_by(table, key_column)?.map(|mut counts| {
        counts.rows.truncate(n);
        counts
    }))
}

// ── Hierarchy ───────────────────────────────────────────────────────────────

/// Row counts per distinct path through an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub levels: Vec<String>,
    pub rows: Vec<(Vec<String>, u32)>,
}

impl Hierarchy {
    /// One column per level plus the count column named `value_name`.
    pub fn to_frame(&self, value_name: &str) -> Result<DataFrame, DashError> {
        let mut columns: Vec<Column> = self
            .levels
            .iter()
            .enumerate()
            .map(|(depth, level)| {
                let values: Vec<&str> = self.rows.iter().map(|(path, _)| path[depth].as_str()).collect();
                Column::new(level.as_str().into(), &values)
            })
            .collect();
        let counts: Vec<u32> = self.rows.iter().map(|(_, n)| *n).collect();
        columns.push(Column::new(value_name.into(), &counts));
        Ok(DataFrame::new(columns)?)
    }
}

/// Count rows per combination of `levels`, paths sorted. Rows with a null
/// at any level are left out. Every level must be a column of the table.
pub fn hierarchy(table: &Table, levels: &[&str]) -> Result<Aggregate<Hierarchy>, DashError> {
    let missing: Vec<&str> = levels
        .iter()
        .copied()
        .filter(|level| !table.has_column(level))
        .collect();
    if levels.is_empty() || !missing.is_empty() {
        return Ok(Aggregate::Unavailable(format!(
            "{} is missing columns for hierarchy: {}",
            table.name(),
            missing.join(", ")
        )));
    }

    let columns = levels
        .iter()
        .map(|level| table.string_values(level))
        .collect::<Result<Vec<_>, _>>()?;

    let mut paths: BTreeMap<Vec<String>, u32> = BTreeMap::new();
    for i in 0..table.height() {
        let path: Option<Vec<String>> = columns.iter().map(|c| c[i].clone()).collect();
        if let Some(path) = path {
            *paths.entry(path).or_insert(0) += 1;
        }
    }
    if paths.is_empty() {
        return Ok(Aggregate::NoData);
    }

    Ok(Aggregate::Ready(Hierarchy {
        levels: levels.iter().map(|l| l.to_string()).collect(),
        rows: paths.into_iter().collect(),
    }))
}

// ── Medal sums per group ────────────────────────────────────────────────────

/// Long-format medal sums: (group, medal type, count).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedMedals {
    pub group_column: String,
    pub rows: Vec<(String, MedalType, i64)>,
}

impl GroupedMedals {
    pub fn get(&self, group: &str, medal: MedalType) -> Option<i64> {
        self.rows
            .iter()
            .find(|(g, m, _)| g == group && *m == medal)
            .map(|(_, _, n)| *n)
    }

    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        let groups: Vec<&str> = self.rows.iter().map(|(g, _, _)| g.as_str()).collect();
        let medals: Vec<&str> = self.rows.iter().map(|(_, m, _)| m.label()).collect();
        let counts: Vec<i64> = self.rows.iter().map(|(_, _, n)| *n).collect();
        Ok(DataFrame::new(vec![
            Column::new(self.group_column.as_str().into(), &groups),
            Column::new(output::MEDAL_TYPE.into(), &medals),
            Column::new(output::COUNT.into(), &counts),
        ])?)
    }
}

/// Sum the selected medal-count columns per distinct `group_column` value.
/// Groups come out sorted; rows with a null group are left out.
pub fn medals_by_group(
    table: &Table,
    group_column: &str,
    medal_types: &BTreeSet<MedalType>,
) -> Result<Aggregate<GroupedMedals>, DashError> {
    if !table.has_column(group_column) {
        return Ok(Aggregate::Unavailable(missing_column(table, group_column)));
    }
    if table.roles().medal_counts.is_empty() {
        return Ok(Aggregate::Unavailable(format!(
            "{} has no medal count columns",
            table.name()
        )));
    }

    let groups = table.string_values(group_column)?;
    let mut sums: BTreeMap<(String, MedalType), i64> = BTreeMap::new();
    for (medal, column) in table.roles().selected_medal_columns(medal_types) {
        for (group, count) in groups.iter().zip(table.count_values(column)?) {
            if let Some(group) = group {
                *sums.entry((group.clone(), medal)).or_insert(0) += count;
            }
        }
    }
    if sums.is_empty() {
        return Ok(Aggregate::NoData);
    }

    Ok(Aggregate::Ready(GroupedMedals {
        group_column: group_column.to_string(),
        rows: sums.into_iter().map(|((g, m), n)| (g, m, n)).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn medals_total() -> Table {
        Table::new(
            "medals_total",
            df!(
                "country" => ["USA", "FRA"],
                "Gold Medal" => [5i64, 4],
                "Silver Medal" => [3i64, 5],
            )
            .unwrap(),
        )
    }

    fn medals(types: &[MedalType]) -> BTreeSet<MedalType> {
        types.iter().copied().collect()
    }

    #[test]
    fn gold_distribution_and_top_one() {
        let table = medals_total();
        let gold = medals(&[MedalType::Gold]);

        let distribution = medal_distribution(&table, &gold).unwrap();
        assert_eq!(
            distribution,
            Aggregate::Ready(MedalDistribution(vec![(MedalType::Gold, 9)]))
        );

        let top = top_n_by_total(&table, &gold, "country", 1).unwrap().ready().unwrap();
        assert_eq!(
            top.rows,
            vec![RankedRow {
                label: "USA".into(),
                total: 5,
                breakdown: vec![(MedalType::Gold, 5)],
            }]
        );
    }

    #[test]
    fn no_medal_types_is_no_data() {
        let table = medals_total();
        assert_eq!(
            medal_distribution(&table, &BTreeSet::new()).unwrap(),
            Aggregate::NoData
        );
        assert_eq!(
            top_n_by_total(&table, &BTreeSet::new(), "country", 10).unwrap(),
            Aggregate::NoData
        );
    }

    #[test]
    fn zero_total_is_no_data() {
        let table = Table::new(
            "medals_total",
            df!("country" => ["USA"], "Gold Medal" => [0i64]).unwrap(),
        );
        assert_eq!(
            medal_distribution(&table, &medals(&MedalType::ALL)).unwrap(),
            Aggregate::NoData
        );
    }

    #[test]
    fn distribution_without_count_columns_is_unavailable() {
        let table = Table::empty("medals_total");
        assert!(matches!(
            medal_distribution(&table, &medals(&MedalType::ALL)).unwrap(),
            Aggregate::Unavailable(_)
        ));
    }

    #[test]
    fn distribution_ignores_row_order_and_repeats() {
        let table = medals_total();
        let reversed = Table::new("medals_total", table.frame().reverse());
        let all = medals(&MedalType::ALL);
        let first = medal_distribution(&table, &all).unwrap();
        assert_eq!(first, medal_distribution(&table, &all).unwrap());
        assert_eq!(first, medal_distribution(&reversed, &all).unwrap());
    }

    #[test]
    fn top_n_is_stable_and_bounded() {
        let table = Table::new(
            "medals_total",
            df!(
                "country" => ["A", "B", "C", "D"],
                "Gold Medal" => [1i64, 3, 1, 3],
            )
            .unwrap(),
        );
        let gold = medals(&[MedalType::Gold]);
        let top = top_n_by_total(&table, &gold, "country", 3).unwrap().ready().unwrap();
        assert_eq!(top.labels(), vec!["B", "D", "A"]);

        let all = top_n_by_total(&table, &gold, "country", 10).unwrap().ready().unwrap();
        assert_eq!(all.rows.len(), 4);
    }

    #[test]
    fn selected_totals_keep_table_order() {
        let table = medals_total();
        let totals = selected_totals(&table, &medals(&MedalType::ALL), "country")
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(totals.labels(), vec!["USA", "FRA"]);
        assert_eq!(totals.rows[1].total, 9);

        let zero = selected_totals(&table, &BTreeSet::new(), "country")
            .unwrap()
            .ready()
            .unwrap();
        assert!(zero.rows.iter().all(|r| r.total == 0));
    }

    #[test]
    fn breakdown_frame_is_long_format() {
        let table = medals_total();
        let top = top_n_by_total(&table, &medals(&MedalType::ALL), "country", 20)
            .unwrap()
            .ready()
            .unwrap();
        let frame = top.breakdown_frame().unwrap();
        assert_eq!(frame.height(), 4);
        assert_eq!(
            frame.get_column_names_str(),
            vec!["country", "Medal Type", "Count"]
        );
    }

    #[test]
    fn count_by_orders_by_frequency_then_first_seen() {
        let table = Table::new(
            "medals",
            df!("discipline" => [Some("Judo"), Some("Rowing"), None, Some("Rowing"), Some("Judo"), Some("Golf")]).unwrap(),
        );
        let counts = count_by(&table, "discipline").unwrap().ready().unwrap();
        assert_eq!(
            counts.rows,
            vec![
                ("Judo".to_string(), 2),
                ("Rowing".to_string(), 2),
                ("Golf".to_string(), 1)
            ]
        );
    }

    #[test]
    fn count_by_missing_column_is_unavailable() {
        let table = medals_total();
        assert!(matches!(
            count_by(&table, "gender").unwrap(),
            Aggregate::Unavailable(_)
        ));
    }

    #[test]
    fn rank_entities_truncates() {
        let table = Table::new(
            "medals",
            df!("name" => ["Marchand", "Ledecky", "Marchand", "McIntosh", "Ledecky", "Marchand"]).unwrap(),
        );
        let top = rank_entities(&table, "name", 2).unwrap().ready().unwrap();
        assert_eq!(
            top.rows,
            vec![("Marchand".to_string(), 3), ("Ledecky".to_string(), 2)]
        );
    }

    #[test]
    fn hierarchy_counts_paths() {
        let table = Table::new(
            "medals",
            df!(
                "Continent" => [Some("Europe"), Some("Europe"), Some("Asia"), None],
                "country" => ["France", "France", "Japan", "Atlantis"],
                "discipline" => ["Judo", "Judo", "Judo", "Judo"],
            )
            .unwrap(),
        );
        let tree = hierarchy(&table, &["Continent", "country", "discipline"])
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(
            tree.rows,
            vec![
                (vec!["Asia".into(), "Japan".into(), "Judo".into()], 1),
                (vec!["Europe".into(), "France".into(), "Judo".into()], 2),
            ]
        );
        assert_eq!(tree.to_frame("Medal Count").unwrap().width(), 4);
    }

    #[test]
    fn hierarchy_needs_every_level() {
        let table = medals_total();
        assert_eq!(
            hierarchy(&table, &["Continent", "country"]).unwrap(),
            Aggregate::Unavailable("medals_total is missing columns for hierarchy: Continent".into())
        );
    }

    #[test]
    fn medals_by_group_sums_selected_types() {
        let table = Table::new(
            "medals_total",
            df!(
                "Continent" => [Some("Europe"), Some("Asia"), Some("Europe"), None],
                "Gold Medal" => [16i64, 40, 12, 3],
                "Silver Medal" => [26i64, 27, 13, 1],
            )
            .unwrap(),
        );
        let grouped = medals_by_group(&table, "Continent", &medals(&[MedalType::Gold]))
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(
            grouped.rows,
            vec![
                ("Asia".to_string(), MedalType::Gold, 40),
                ("Europe".to_string(), MedalType::Gold, 28),
            ]
        );
        assert_eq!(grouped.get("Europe", MedalType::Silver), None);
    }
}
