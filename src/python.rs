use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::aggregation::Aggregate;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::error::DashError;
use crate::filter::{FilterSelection, MedalType};
use crate::pages::GenderScope;
use crate::schema;
use crate::store::Dataset;

type Profile = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<String>,
);

/// Dashboard session for a Python rendering layer.
///
/// Every chart method takes the four filter lists; `None` for
/// `medal_types` means all three. Charts with nothing to show return `None`.
#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    inner: Dashboard,
}

fn selection(
    continents: Option<Vec<String>>,
    countries: Option<Vec<String>>,
    sports: Option<Vec<String>>,
    medal_types: Option<Vec<String>>,
) -> PyResult<FilterSelection> {
    let mut selection = FilterSelection::default()
        .with_continents(continents.unwrap_or_default())
        .with_countries(countries.unwrap_or_default())
        .with_sports(sports.unwrap_or_default());
    if let Some(types) = medal_types {
        let parsed = types
            .iter()
            .map(|t| t.parse::<MedalType>())
            .collect::<Result<Vec<_>, DashError>>()?;
        selection = selection.with_medal_types(parsed);
    }
    Ok(selection)
}

fn to_py<T>(
    aggregate: Aggregate<T>,
    to_frame: impl FnOnce(&T) -> Result<polars::prelude::DataFrame, DashError>,
) -> PyResult<Option<PyDataFrame>> {
    match aggregate {
        Aggregate::Ready(value) => Ok(Some(PyDataFrame(to_frame(&value)?))),
        Aggregate::NoData => Ok(None),
        Aggregate::Unavailable(why) => {
            tracing::info!("Chart unavailable: {why}");
            Ok(None)
        }
    }
}

#[pymethods]
impl PyDashboard {
    #[new]
    #[pyo3(signature = (data_dir=None))]
    fn new(data_dir: Option<String>) -> PyResult<Self> {
        let mut config = DashboardConfig::from_env()?;
        if let Some(dir) = data_dir {
            config = config.with_data_dir(dir);
        }
        Ok(Self {
            inner: Dashboard::open(config),
        })
    }

    // ── Tables ──────────────────────────────────────────────────────────────

    /// A loaded dataset by key, e.g. "medals_total". Missing files give an empty frame.
    fn table(&self, name: &str) -> PyResult<PyDataFrame> {
        let dataset = Dataset::from_key(name)
            .ok_or_else(|| DashError::InvalidData(format!("Unknown dataset: '{name}'")))?;
        Ok(PyDataFrame(self.inner.table(dataset).frame().clone()))
    }

    /// Human-readable diagnostics for datasets that failed to load.
    fn load_issues(&self) -> Vec<String> {
        self.inner
            .store()
            .report()
            .issues
            .iter()
            .map(|issue| issue.to_string())
            .collect()
    }

    /// (continents, countries, sports, medal types) the filter widgets may offer.
    #[pyo3(signature = (continents=None))]
    fn filter_options(
        &self,
        continents: Option<Vec<String>>,
    ) -> PyResult<(Vec<String>, Vec<String>, Vec<String>, Vec<String>)> {
        let selection = FilterSelection::default().with_continents(continents.unwrap_or_default());
        let options = self.inner.filter_options(&selection)?;
        Ok((
            options.continents,
            options.countries,
            options.sports,
            options
                .medal_types
                .iter()
                .map(|m| m.label().to_string())
                .collect(),
        ))
    }

    // ── Overview ────────────────────────────────────────────────────────────

    /// (athletes, countries, sports, events, medals)
    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn kpis(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<(usize, usize, usize, usize, i64)> {
        let sel = selection(continents, countries, sports, medal_types)?;
        let k = self.inner.overview(&sel)?.kpis;
        Ok((k.athletes, k.countries, k.sports, k.events, k.medals))
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn medal_distribution(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.overview(&sel)?.medal_distribution, |d| d.to_frame())
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn top_countries(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.overview(&sel)?.top_countries, |r| r.to_frame())
    }

    // ── Global analysis ─────────────────────────────────────────────────────

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn country_totals(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.global_analysis(&sel)?.country_totals, |r| r.to_frame())
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn medal_hierarchy(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.global_analysis(&sel)?.hierarchy, |h| {
            h.to_frame(schema::output::MEDAL_COUNT)
        })
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn continent_medals(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.global_analysis(&sel)?.continent_medals, |g| g.to_frame())
    }

    /// Extended country ranking in long format (country, Medal Type, Count).
    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn country_breakdown(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.global_analysis(&sel)?.top_countries, |r| r.breakdown_frame())
    }

    // ── Athletes ────────────────────────────────────────────────────────────

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn athlete_names(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Vec<String>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        Ok(self
            .inner
            .athlete_performance(&sel, &GenderScope::World)?
            .athlete_names)
    }

    /// (name, country, sport, disciplines, height, weight, coach)
    #[pyo3(signature = (name, continents=None, countries=None, sports=None, medal_types=None))]
    fn athlete_profile(
        &self,
        name: &str,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<Profile>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        Ok(self.inner.athlete_profile(&sel, name)?.map(|p| {
            (
                p.name,
                p.country,
                p.sport,
                p.disciplines,
                p.height,
                p.weight,
                p.coach,
            )
        }))
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn age_distribution(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(
            self.inner.athlete_performance(&sel, &GenderScope::World)?.ages,
            |a| a.to_frame(),
        )
    }

    /// `view` is "World", "Continent" or "Country"; `value` names the continent or country.
    #[pyo3(signature = (view="World", value=None, continents=None, countries=None, sports=None, medal_types=None))]
    #[allow(clippy::too_many_arguments)]
    fn gender_distribution(
        &self,
        view: &str,
        value: Option<String>,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let scope = match (view, value) {
            ("World", _) => GenderScope::World,
            ("Continent", Some(v)) => GenderScope::Continent(v),
            ("Country", Some(v)) => GenderScope::Country(v),
            (other, _) => {
                return Err(DashError::InvalidData(format!(
                    "Invalid view: '{other}'. Must be 'World', or 'Continent'/'Country' with a value"
                ))
                .into())
            }
        };
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.athlete_performance(&sel, &scope)?.gender, |c| c.to_frame())
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn top_athletes(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(
            self.inner
                .athlete_performance(&sel, &GenderScope::World)?
                .top_athletes,
            |c| c.to_frame(),
        )
    }

    // ── Sports and events ───────────────────────────────────────────────────

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn schedule(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.sports_and_events(&sel)?.schedule, |s| s.to_frame())
    }

    #[pyo3(signature = (continents=None, countries=None, sports=None, medal_types=None))]
    fn medals_by_sport(
        &self,
        continents: Option<Vec<String>>,
        countries: Option<Vec<String>>,
        sports: Option<Vec<String>>,
        medal_types: Option<Vec<String>>,
    ) -> PyResult<Option<PyDataFrame>> {
        let sel = selection(continents, countries, sports, medal_types)?;
        to_py(self.inner.sports_and_events(&sel)?.medals_by_sport, |c| c.to_frame())
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Country
    let country = PyModule::new(m.py(), "country")?;
    country.add("COUNTRY", schema::country::COUNTRY)?;
    country.add("NOC", schema::country::NOC)?;
    country.add("COUNTRY_CODE", schema::country::COUNTRY_CODE)?;
    m.add_submodule(&country)?;

    // Sport
    let sport = PyModule::new(m.py(), "sport")?;
    sport.add("SPORT", schema::sport::SPORT)?;
    sport.add("DISCIPLINE", schema::sport::DISCIPLINE)?;
    sport.add("DISCIPLINES", schema::sport::DISCIPLINES)?;
    m.add_submodule(&sport)?;

    // Medal
    let medal = PyModule::new(m.py(), "medal")?;
    medal.add("GOLD_MEDAL", schema::medal::GOLD_MEDAL)?;
    medal.add("SILVER_MEDAL", schema::medal::SILVER_MEDAL)?;
    medal.add("BRONZE_MEDAL", schema::medal::BRONZE_MEDAL)?;
    medal.add("TOTAL", schema::medal::TOTAL)?;
    medal.add("MEDAL_TYPE", schema::medal::MEDAL_TYPE)?;
    m.add_submodule(&medal)?;

    // NOC
    let noc = PyModule::new(m.py(), "noc")?;
    noc.add("CODE", schema::noc::CODE)?;
    noc.add("COUNTRY", schema::noc::COUNTRY)?;
    noc.add("CONTINENT", schema::noc::CONTINENT)?;
    noc.add("UNKNOWN_CONTINENT", schema::noc::UNKNOWN_CONTINENT)?;
    m.add_submodule(&noc)?;

    // Output
    let output = PyModule::new(m.py(), "output")?;
    output.add("MEDAL_TYPE", schema::output::MEDAL_TYPE)?;
    output.add("COUNT", schema::output::COUNT)?;
    output.add("MEDAL_COUNT", schema::output::MEDAL_COUNT)?;
    output.add("SELECTED_TOTAL", schema::output::SELECTED_TOTAL)?;
    output.add("AGE", schema::output::AGE)?;
    output.add("START", schema::output::START)?;
    output.add("END", schema::output::END)?;
    m.add_submodule(&output)?;

    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    crate::logging::init();
    m.add_class::<PyDashboard>()?;
    add_schema_exports(m)?;
    Ok(())
}
