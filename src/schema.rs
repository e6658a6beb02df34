/// Column-name constants for the Olympic result tables.
/// Single source of truth - exported to Python via PyO3.

// ── Country columns ─────────────────────────────────────────────────────────
pub mod country {
    pub const COUNTRY: &str = "country";
    pub const NOC: &str = "noc";
    pub const COUNTRY_CODE: &str = "country_code";

    /// Probe order for the column naming a row's country.
    pub const ALIASES: [&str; 2] = [COUNTRY, NOC];
}

// ── Sport columns ───────────────────────────────────────────────────────────
pub mod sport {
    pub const SPORT: &str = "sport";
    pub const DISCIPLINE: &str = "discipline";
    pub const DISCIPLINES: &str = "disciplines";

    /// Probe order for the column naming a row's sport.
    pub const ALIASES: [&str; 2] = [SPORT, DISCIPLINE];
}

// ── Medal columns ───────────────────────────────────────────────────────────
pub mod medal {
    pub const GOLD_MEDAL: &str = "Gold Medal";
    pub const SILVER_MEDAL: &str = "Silver Medal";
    pub const BRONZE_MEDAL: &str = "Bronze Medal";
    pub const TOTAL: &str = "Total";

    /// Categorical column on per-medal tables; values are the count column names.
    pub const MEDAL_TYPE: &str = "medal_type";

    pub const COUNT_COLUMNS: [&str; 3] = [GOLD_MEDAL, SILVER_MEDAL, BRONZE_MEDAL];
}

// ── NOC columns ─────────────────────────────────────────────────────────────
pub mod noc {
    pub const CODE: &str = "code";
    pub const COUNTRY: &str = "country";
    pub const CONTINENT: &str = "Continent";

    /// Continent assigned when a country cannot be classified.
    pub const UNKNOWN_CONTINENT: &str = "Unknown";
}

// ── Athlete columns ─────────────────────────────────────────────────────────
pub mod athlete {
    pub const NAME: &str = "name";
    pub const GENDER: &str = "gender";
    pub const AGE: &str = "age";
    pub const BIRTH_DATE: &str = "birth_date";
    pub const HEIGHT: &str = "height";
    pub const WEIGHT: &str = "weight";
    pub const COACH: &str = "coach";
}

// ── Schedule columns ────────────────────────────────────────────────────────
pub mod schedule {
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
}

// ── Aggregate result columns ────────────────────────────────────────────────
pub mod output {
    pub const MEDAL_TYPE: &str = "Medal Type";
    pub const COUNT: &str = "Count";
    pub const MEDAL_COUNT: &str = "Medal Count";
    pub const SELECTED_TOTAL: &str = "Selected Total";
    pub const AGE: &str = "age";
    pub const START: &str = "start";
    pub const END: &str = "end";
}
