use std::fmt;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use thiserror::Error;

use crate::error::DashError;
use crate::schema::{athlete, medal, sport};
use crate::table::Table;

/// The thirteen result tables the dashboard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dataset {
    Athletes,
    Coaches,
    Events,
    Medals,
    MedalsTotal,
    Medallists,
    Nocs,
    Schedules,
    SchedulesPreliminary,
    Teams,
    TechnicalOfficials,
    TorchRoute,
    Venues,
}

impl Dataset {
    pub const ALL: [Dataset; 13] = [
        Dataset::Athletes,
        Dataset::Coaches,
        Dataset::Events,
        Dataset::Medals,
        Dataset::MedalsTotal,
        Dataset::Medallists,
        Dataset::Nocs,
        Dataset::Schedules,
        Dataset::SchedulesPreliminary,
        Dataset::Teams,
        Dataset::TechnicalOfficials,
        Dataset::TorchRoute,
        Dataset::Venues,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Dataset::Athletes => "athletes",
            Dataset::Coaches => "coaches",
            Dataset::Events => "events",
            Dataset::Medals => "medals",
            Dataset::MedalsTotal => "medals_total",
            Dataset::Medallists => "medallists",
            Dataset::Nocs => "nocs",
            Dataset::Schedules => "schedules",
            Dataset::SchedulesPreliminary => "schedules_preliminary",
            Dataset::Teams => "teams",
            Dataset::TechnicalOfficials => "technical_officials",
            Dataset::TorchRoute => "torch_route",
            Dataset::Venues => "venues",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.key())
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Why a dataset came up empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadIssue {
    #[error("File {} not found for dataset {dataset}", .path.display())]
    Missing { dataset: Dataset, path: PathBuf },

    #[error("Error loading {} for dataset {dataset}: {reason}", .path.display())]
    Malformed {
        dataset: Dataset,
        path: PathBuf,
        reason: String,
    },
}

impl LoadIssue {
    pub fn dataset(&self) -> Dataset {
        match self {
            LoadIssue::Missing { dataset, .. } | LoadIssue::Malformed { dataset, .. } => *dataset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Every dataset, loaded once. A dataset that could not be read is an
/// empty table, never an absent one.
#[derive(Debug, Clone)]
pub struct TableStore {
    tables: Vec<Table>,
    report: LoadReport,
}

impl TableStore {
    /// Read `<dataset>.csv` for every dataset under `data_dir`.
    pub fn load(data_dir: &Path) -> Self {
        let mut report = LoadReport::default();
        let tables = Dataset::ALL
            .into_iter()
            .map(|dataset| {
                let path = data_dir.join(dataset.file_name());
                if !path.is_file() {
                    tracing::warn!("File {} not found in {}", dataset.file_name(), data_dir.display());
                    report.issues.push(LoadIssue::Missing { dataset, path });
                    return Table::empty(dataset.key());
                }
                match read_csv_as_strings(&path).and_then(|df| normalize(dataset, df)) {
                    Ok(df) => {
                        tracing::debug!(dataset = dataset.key(), rows = df.height(), "Loaded dataset");
                        Table::new(dataset.key(), df)
                    }
                    Err(err) => {
                        tracing::error!("Error loading {}: {err}", dataset.file_name());
                        report.issues.push(LoadIssue::Malformed {
                            dataset,
                            path,
                            reason: err.to_string(),
                        });
                        Table::empty(dataset.key())
                    }
                }
            })
            .collect();

        tracing::info!(
            missing_or_malformed = report.issues.len(),
            "Loaded {} datasets from {}",
            Dataset::ALL.len(),
            data_dir.display()
        );
        Self { tables, report }
    }

    /// Build a store from frames already in memory; absent datasets are empty.
    /// Frames go through the same normalisation as loaded files.
    pub fn from_frames(frames: impl IntoIterator<Item = (Dataset, DataFrame)>) -> Result<Self, DashError> {
        let mut tables: Vec<Table> = Dataset::ALL.into_iter().map(|d| Table::empty(d.key())).collect();
        for (dataset, df) in frames {
            tables[dataset as usize] = Table::new(dataset.key(), normalize(dataset, df)?);
        }
        Ok(Self {
            tables,
            report: LoadReport::default(),
        })
    }

    pub fn get(&self, dataset: Dataset) -> &Table {
        &self.tables[dataset as usize]
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dataset, &Table)> {
        Dataset::ALL.into_iter().zip(self.tables.iter())
    }
}

/// Read a CSV file with all columns as String dtype, column names trimmed.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, DashError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

const COUNT_COLUMNS: [&str; 4] = [
    medal::GOLD_MEDAL,
    medal::SILVER_MEDAL,
    medal::BRONZE_MEDAL,
    medal::TOTAL,
];

const MEASURE_COLUMNS: [&str; 3] = [athlete::HEIGHT, athlete::WEIGHT, athlete::AGE];

/// Load-time schema normalisation: numeric columns are parsed, and athletes
/// with a `disciplines` list get their `sport` column from it.
fn normalize(dataset: Dataset, df: DataFrame) -> Result<DataFrame, DashError> {
    let mut df = parse_numeric(df, &COUNT_COLUMNS, DataType::Int64)?;
    df = parse_numeric(df, &MEASURE_COLUMNS, DataType::Float64)?;

    // `disciplines` is authoritative; any `sport` column is replaced.
    if dataset == Dataset::Athletes && df.column(sport::DISCIPLINES).is_ok() {
        let derived: Vec<Option<String>> = df
            .column(sport::DISCIPLINES)?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|raw| parse_list_literal(raw).join(", ")))
            .collect();
        df.with_column(Series::new(sport::SPORT.into(), derived))?;
    }
    Ok(df)
}

/// Parse the string columns among `columns` to `dtype`; junk becomes null.
fn parse_numeric(df: DataFrame, columns: &[&str], dtype: DataType) -> Result<DataFrame, DashError> {
    let exprs: Vec<Expr> = columns
        .iter()
        .filter(|c| matches!(df.column(c).map(|s| s.dtype().clone()), Ok(DataType::String)))
        .map(|c| {
            col(*c)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
                .cast(dtype.clone())
        })
        .collect();
    if exprs.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Read a list literal such as `['Athletics', 'Swimming']`.
///
/// A bare value, quoted or not, is a one-element list. A malformed literal
/// or blank value is an empty list.
pub fn parse_list_literal(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
        let bare = ['\'', '"']
            .into_iter()
            .find_map(|q| raw.strip_prefix(q).and_then(|r| r.strip_suffix(q)))
            .unwrap_or(raw)
            .trim();
        // stray brackets or quotes mean a truncated literal
        return if bare.is_empty() || bare.contains(['[', ']', '\'', '"']) {
            Vec::new()
        } else {
            vec![bare.to_string()]
        };
    };

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                items.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() {
        return Vec::new();
    }
    items.push(current.trim().to_string());
    items.retain(|item| !item.is_empty());
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_literals() {
        assert_eq!(parse_list_literal("['Wrestling']"), vec!["Wrestling"]);
        assert_eq!(
            parse_list_literal("['Athletics', \"Swimming\"]"),
            vec!["Athletics", "Swimming"]
        );
        assert_eq!(parse_list_literal("['Cycling Road, Men']"), vec!["Cycling Road, Men"]);
        assert_eq!(parse_list_literal("Judo"), vec!["Judo"]);
        assert_eq!(parse_list_literal("[]"), Vec::<String>::new());
        assert_eq!(parse_list_literal("['broken"), Vec::<String>::new());
        assert_eq!(parse_list_literal("   "), Vec::<String>::new());
    }

    #[test]
    fn truncated_list_literals_are_empty() {
        assert_eq!(parse_list_literal("'Judo'"), vec!["Judo"]);
        assert_eq!(parse_list_literal("['Judo'"), Vec::<String>::new());
        assert_eq!(parse_list_literal("'Judo"), Vec::<String>::new());
        assert_eq!(parse_list_literal("Judo]"), Vec::<String>::new());
        assert_eq!(parse_list_literal("["), Vec::<String>::new());
    }

    #[test]
    fn dataset_keys_round_trip() {
        for dataset in Dataset::ALL {
            assert_eq!(Dataset::from_key(dataset.key()), Some(dataset));
        }
        assert_eq!(Dataset::MedalsTotal.file_name(), "medals_total.csv");
    }

    #[test]
    fn athletes_gain_sport_from_disciplines() {
        let athletes = df!(
            "name" => ["A", "B"],
            "disciplines" => ["['Wrestling']", "['Athletics', 'Swimming']"],
        )
        .unwrap();
        let store = TableStore::from_frames([(Dataset::Athletes, athletes)]).unwrap();
        let table = store.get(Dataset::Athletes);
        assert_eq!(table.roles().sport.as_deref(), Some("sport"));
        assert_eq!(
            table.string_values("sport").unwrap(),
            vec![
                Some("Wrestling".to_string()),
                Some("Athletics, Swimming".to_string())
            ]
        );
    }

    #[test]
    fn disciplines_replace_an_existing_sport_column() {
        let athletes = df!(
            "name" => ["A"],
            "sport" => ["Stale"],
            "disciplines" => ["['Judo']"],
        )
        .unwrap();
        let store = TableStore::from_frames([(Dataset::Athletes, athletes)]).unwrap();
        let table = store.get(Dataset::Athletes);
        assert_eq!(table.frame().width(), 3);
        assert_eq!(table.string_values("sport").unwrap(), vec![Some("Judo".to_string())]);
    }

    #[test]
    fn medal_counts_are_parsed() {
        let totals = df!(
            "country" => ["France", "Kenya"],
            "Gold Medal" => [" 16", "n/a"],
        )
        .unwrap();
        let store = TableStore::from_frames([(Dataset::MedalsTotal, totals)]).unwrap();
        let table = store.get(Dataset::MedalsTotal);
        assert_eq!(table.frame().column("Gold Medal").unwrap().dtype(), &DataType::Int64);
        assert_eq!(table.count_values("Gold Medal").unwrap(), vec![16, 0]);
    }

    #[test]
    fn absent_frames_are_empty_tables() {
        let store = TableStore::from_frames([]).unwrap();
        for (dataset, table) in store.iter() {
            assert!(table.is_empty(), "{dataset} should be empty");
            assert_eq!(table.name(), dataset.key());
        }
    }
}
