//! Per-page pipelines: project the tables a page needs through the active
//! filter, then run the aggregates its charts consume.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::aggregation::{
    self, Aggregate, CategoryCounts, GroupedMedals, Hierarchy, MedalDistribution, Ranking,
};
use crate::dashboard::Dashboard;
use crate::error::DashError;
use crate::filter::FilterSelection;
use crate::projection::{attach_continent, project};
use crate::schema::{athlete, country, noc, output, schedule, sport};
use crate::store::Dataset;
use crate::table::Table;

// ── Overview ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Kpis {
    pub athletes: usize,
    pub countries: usize,
    pub sports: usize,
    pub events: usize,
    pub medals: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub kpis: Kpis,
    pub medal_distribution: Aggregate<MedalDistribution>,
    pub top_countries: Aggregate<Ranking>,
}

// ── Global analysis ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalAnalysis {
    /// Every country with its selected total, for a choropleth.
    pub country_totals: Aggregate<Ranking>,
    /// Continent → country → discipline medal counts.
    pub hierarchy: Aggregate<Hierarchy>,
    pub continent_medals: Aggregate<GroupedMedals>,
    /// Extended ranking with a per-medal breakdown.
    pub top_countries: Aggregate<Ranking>,
}

const HIERARCHY_LEVELS: [&str; 3] = [noc::CONTINENT, country::COUNTRY, sport::DISCIPLINE];

// ── Athlete performance ─────────────────────────────────────────────────────

/// Which athletes the gender split covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenderScope {
    #[default]
    World,
    Continent(String),
    Country(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeRecord {
    pub sport: Option<String>,
    pub gender: Option<String>,
    pub age: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeDistribution(pub Vec<AgeRecord>);

impl AgeDistribution {
    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        let sports: Vec<Option<&str>> = self.0.iter().map(|r| r.sport.as_deref()).collect();
        let genders: Vec<Option<&str>> = self.0.iter().map(|r| r.gender.as_deref()).collect();
        let ages: Vec<f64> = self.0.iter().map(|r| r.age).collect();
        Ok(DataFrame::new(vec![
            Column::new(sport::SPORT.into(), &sports),
            Column::new(athlete::GENDER.into(), &genders),
            Column::new(output::AGE.into(), &ages),
        ])?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AthletePerformance {
    /// Sorted names for the athlete search box.
    pub athlete_names: Vec<String>,
    pub ages: Aggregate<AgeDistribution>,
    pub gender: Aggregate<CategoryCounts>,
    pub top_athletes: Aggregate<CategoryCounts>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AthleteProfile {
    pub name: String,
    pub country: Option<String>,
    pub sport: Option<String>,
    pub disciplines: Option<String>,
    /// Only positive measurements are reported.
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub coach: Option<String>,
}

// ── Sports and events ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub discipline: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule(pub Vec<ScheduleSlot>);

impl Schedule {
    pub fn to_frame(&self) -> Result<DataFrame, DashError> {
        const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
        let disciplines: Vec<&str> = self.0.iter().map(|s| s.discipline.as_str()).collect();
        let starts: Vec<String> = self.0.iter().map(|s| s.start.format(FORMAT).to_string()).collect();
        let ends: Vec<String> = self.0.iter().map(|s| s.end.format(FORMAT).to_string()).collect();
        Ok(DataFrame::new(vec![
            Column::new(sport::DISCIPLINE.into(), &disciplines),
            Column::new(output::START.into(), &starts),
            Column::new(output::END.into(), &ends),
        ])?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportsAndEvents {
    pub schedule: Aggregate<Schedule>,
    pub medals_by_sport: Aggregate<CategoryCounts>,
}

// ── Pipelines ───────────────────────────────────────────────────────────────

impl Dashboard {
    /// Headline metrics, medal split, and the top countries.
    pub fn overview(&self, selection: &FilterSelection) -> Result<Overview, DashError> {
        let filter = self.active_filter(selection);

        let athletes = project(self.table(Dataset::Athletes), &filter)?;
        let nocs = project(self.table(Dataset::Nocs), &filter)?;
        let events = project(self.table(Dataset::Events), &filter)?;
        let medals_total = project(self.table(Dataset::MedalsTotal), &filter)?;

        let sports = match &events.roles().sport {
            Some(column) => events.distinct_values(column)?.len(),
            None => 0,
        };
        let mut medals = 0;
        for (_, column) in medals_total
            .roles()
            .selected_medal_columns(&filter.medal_types)
        {
            medals += medals_total.count_values(column)?.into_iter().sum::<i64>();
        }

        Ok(Overview {
            kpis: Kpis {
                athletes: athletes.height(),
                countries: nocs.height(),
                sports,
                events: events.height(),
                medals,
            },
            medal_distribution: aggregation::medal_distribution(&medals_total, &filter.medal_types)?,
            top_countries: aggregation::top_n_by_total(
                &medals_total,
                &filter.medal_types,
                country::COUNTRY,
                self.config().top_countries,
            )?,
        })
    }

    /// Country map, continent hierarchy, continent totals, and the extended ranking.
    pub fn global_analysis(&self, selection: &FilterSelection) -> Result<GlobalAnalysis, DashError> {
        let filter = self.active_filter(selection);
        let nocs = self.nocs();

        let medals_total = attach_continent(self.table(Dataset::MedalsTotal), nocs)?;
        let medals_total = project(&medals_total, &filter)?;

        let medals = attach_continent(self.table(Dataset::Medals), nocs)?;
        let medals = project(&medals, &filter)?;

        Ok(GlobalAnalysis {
            country_totals: aggregation::selected_totals(
                &medals_total,
                &filter.medal_types,
                country::COUNTRY,
            )?,
            hierarchy: aggregation::hierarchy(&medals, &HIERARCHY_LEVELS)?,
            continent_medals: aggregation::medals_by_group(
                &medals_total,
                noc::CONTINENT,
                &filter.medal_types,
            )?,
            top_countries: aggregation::top_n_by_total(
                &medals_total,
                &filter.medal_types,
                country::COUNTRY,
                self.config().extended_countries,
            )?,
        })
    }

    /// Athlete list, ages, gender split for `scope`, and the most decorated athletes.
    pub fn athlete_performance(
        &self,
        selection: &FilterSelection,
        scope: &GenderScope,
    ) -> Result<AthletePerformance, DashError> {
        let filter = self.active_filter(selection);
        let athletes = project(self.table(Dataset::Athletes), &filter)?;
        let medals = project(self.table(Dataset::Medals), &filter)?;

        Ok(AthletePerformance {
            athlete_names: athletes.distinct_values(athlete::NAME)?,
            ages: self.ages(&athletes)?,
            gender: self.gender_split(&athletes, scope)?,
            top_athletes: aggregation::rank_entities(
                &medals,
                athlete::NAME,
                self.config().top_athletes,
            )?,
        })
    }

    /// First athlete named `name` among those the selection keeps.
    pub fn athlete_profile(
        &self,
        selection: &FilterSelection,
        name: &str,
    ) -> Result<Option<AthleteProfile>, DashError> {
        let athletes = project(self.table(Dataset::Athletes), &self.active_filter(selection))?;
        if !athletes.has_column(athlete::NAME) {
            return Ok(None);
        }
        let Some(row) = athletes
            .string_values(athlete::NAME)?
            .iter()
            .position(|n| n.as_deref() == Some(name))
        else {
            return Ok(None);
        };

        let text = |column: &str| -> Result<Option<String>, DashError> {
            if !athletes.has_column(column) {
                return Ok(None);
            }
            Ok(athletes.string_values(column)?[row]
                .clone()
                .filter(|v| !v.trim().is_empty()))
        };
        let measure = |column: &str| -> Result<Option<f64>, DashError> {
            if !athletes.has_column(column) {
                return Ok(None);
            }
            Ok(athletes.float_values(column)?[row].filter(|v| *v > 0.0))
        };

        Ok(Some(AthleteProfile {
            name: name.to_string(),
            country: text(country::COUNTRY)?,
            sport: text(sport::SPORT)?,
            disciplines: text(sport::DISCIPLINES)?,
            height: measure(athlete::HEIGHT)?,
            weight: measure(athlete::WEIGHT)?,
            coach: text(athlete::COACH)?,
        }))
    }

    /// Timeline slots and medals per discipline.
    pub fn sports_and_events(&self, selection: &FilterSelection) -> Result<SportsAndEvents, DashError> {
        let filter = self.active_filter(selection);
        let schedules = project(self.table(Dataset::Schedules), &filter)?;
        let medals = project(self.table(Dataset::Medals), &filter)?;

        let medals_by_sport = match &medals.roles().sport {
            Some(column) => aggregation::count_by(&medals, column)?,
            None => aggregation::count_by(&medals, sport::DISCIPLINE)?,
        };

        Ok(SportsAndEvents {
            schedule: self.schedule(&schedules)?,
            medals_by_sport,
        })
    }

    fn ages(&self, athletes: &Table) -> Result<Aggregate<AgeDistribution>, DashError> {
        let ages: Vec<Option<f64>> = if athletes.has_column(athlete::AGE) {
            athletes.float_values(athlete::AGE)?
        } else if athletes.has_column(athlete::BIRTH_DATE) {
            let year = self.config().games_year;
            athletes
                .string_values(athlete::BIRTH_DATE)?
                .into_iter()
                .map(|d| d.and_then(|d| parse_date(&d)).map(|d| f64::from(year - d.year())))
                .collect()
        } else {
            return Ok(Aggregate::Unavailable(format!(
                "{} has no age or birth date",
                athletes.name()
            )));
        };

        let sports = optional_strings(athletes, athletes.roles().sport.as_deref())?;
        let genders = optional_strings(athletes, Some(athlete::GENDER))?;

        let records: Vec<AgeRecord> = ages
            .into_iter()
            .enumerate()
            .filter_map(|(i, age)| {
                Some(AgeRecord {
                    sport: sports.get(i).cloned().flatten(),
                    gender: genders.get(i).cloned().flatten(),
                    age: age?,
                })
            })
            .collect();

        if records.is_empty() {
            return Ok(Aggregate::NoData);
        }
        Ok(Aggregate::Ready(AgeDistribution(records)))
    }

    fn gender_split(
        &self,
        athletes: &Table,
        scope: &GenderScope,
    ) -> Result<Aggregate<CategoryCounts>, DashError> {
        let scoped = match scope {
            GenderScope::World => athletes.clone(),
            GenderScope::Continent(continent) => {
                let joined = attach_continent(athletes, self.nocs())?;
                if !joined.has_column(noc::CONTINENT) {
                    return Ok(Aggregate::Unavailable("Continent data not available".into()));
                }
                rows_equal(&joined, noc::CONTINENT, continent)?
            }
            GenderScope::Country(name) => {
                let Some(column) = athletes.roles().country.clone() else {
                    return Ok(Aggregate::Unavailable(format!(
                        "{} has no country column",
                        athletes.name()
                    )));
                };
                rows_equal(athletes, &column, name)?
            }
        };
        aggregation::count_by(&scoped, athlete::GENDER)
    }

    fn schedule(&self, schedules: &Table) -> Result<Aggregate<Schedule>, DashError> {
        let Some(label_column) = schedules.roles().sport.clone() else {
            return Ok(Aggregate::Unavailable(format!(
                "{} has no discipline column",
                schedules.name()
            )));
        };
        if !schedules.has_column(schedule::START_DATE) {
            return Ok(Aggregate::Unavailable(format!(
                "{} has no '{}' column",
                schedules.name(),
                schedule::START_DATE
            )));
        }

        let labels = schedules.string_values(&label_column)?;
        let starts = schedules.string_values(schedule::START_DATE)?;
        let ends = optional_strings(schedules, Some(schedule::END_DATE))?;
        let slot = self.config().default_slot;

        let slots: Vec<ScheduleSlot> = labels
            .into_iter()
            .zip(starts)
            .enumerate()
            .filter_map(|(i, (label, start))| {
                let start = parse_timestamp(start?.as_str())?;
                let end = ends
                    .get(i)
                    .cloned()
                    .flatten()
                    .and_then(|e| parse_timestamp(&e))
                    .unwrap_or(start + slot);
                Some(ScheduleSlot {
                    discipline: label?,
                    start,
                    end,
                })
            })
            .collect();

        if slots.is_empty() {
            return Ok(Aggregate::NoData);
        }
        Ok(Aggregate::Ready(Schedule(slots)))
    }
}

/// Column values, or all-`None` when the column is absent.
fn optional_strings(table: &Table, column: Option<&str>) -> Result<Vec<Option<String>>, DashError> {
    match column {
        Some(column) if table.has_column(column) => table.string_values(column),
        _ => Ok(vec![None; table.height()]),
    }
}

fn rows_equal(table: &Table, column: &str, value: &str) -> Result<Table, DashError> {
    let frame = table
        .frame()
        .clone()
        .lazy()
        .filter(col(column).cast(DataType::String).eq(lit(value)))
        .collect()?;
    Ok(table.with_frame(frame))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|t| t.date()))
}

/// RFC 3339 (local wall-clock time kept), or `YYYY-MM-DD[ T]HH:MM:SS`, or a bare date.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_in_the_formats_schedules_use() {
        let rfc = parse_timestamp("2024-07-24T15:00:00+02:00").unwrap();
        assert_eq!((rfc.hour(), rfc.minute()), (15, 0));
        assert!(parse_timestamp("2024-07-24 15:30:00").is_some());
        assert!(parse_timestamp("2024-07-24T15:30:00").is_some());
        assert_eq!(
            parse_timestamp("2024-07-24").unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 24)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn birth_dates_parse_leniently() {
        assert_eq!(
            parse_date(" 1998-02-11 "),
            NaiveDate::from_ymd_opt(1998, 2, 11)
        );
        assert_eq!(parse_date("unknown"), None);
    }
}
