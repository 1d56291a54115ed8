use std::collections::HashSet;
use std::path::{Path, PathBuf};

use polars::datatypes::TimeUnit;
use polars::prelude::StrptimeOptions;
use polars::prelude::*;

use crate::error::DashError;
use crate::schema::{files, licensee, sales};

/// Which of the three tracked sales categories a series belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesCategory {
    Total,
    Medical,
    Recreational,
}

impl SalesCategory {
    pub const ALL: [SalesCategory; 3] = [
        SalesCategory::Total,
        SalesCategory::Medical,
        SalesCategory::Recreational,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SalesCategory::Total => "Total",
            SalesCategory::Medical => "Medical",
            SalesCategory::Recreational => "Recreational",
        }
    }
}

/// One licensed retail location from the directory file.
#[derive(Debug, Clone, PartialEq)]
pub struct Licensee {
    pub global_id: String,
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
}

/// Explicit data-directory configuration, validated before any load.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub licensee_file: String,
    pub total_file: String,
    pub medical_file: String,
    pub recreational_file: String,
}

impl DataConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            licensee_file: files::LICENSEES.to_string(),
            total_file: files::TOTAL_SALES.to_string(),
            medical_file: files::MEDICAL_SALES.to_string(),
            recreational_file: files::RECREATIONAL_SALES.to_string(),
        }
    }

    /// Check that the directory and every configured file exist.
    pub fn validate(&self) -> Result<(), DashError> {
        if !self.data_dir.is_dir() {
            return Err(DashError::InvalidData(format!(
                "Data directory does not exist: {}",
                self.data_dir.display()
            )));
        }
        for name in [
            &self.licensee_file,
            &self.total_file,
            &self.medical_file,
            &self.recreational_file,
        ] {
            if !self.data_dir.join(name).is_file() {
                return Err(DashError::InvalidData(format!(
                    "Missing data file: {}",
                    self.data_dir.join(name).display()
                )));
            }
        }
        Ok(())
    }
}

/// Immutable working set: the licensee directory restricted to dispensaries
/// present in the sales data, plus the three date-indexed sales frames.
#[derive(Debug)]
pub struct SalesModel {
    licensees: DataFrame,
    total: DataFrame,
    medical: DataFrame,
    recreational: DataFrame,
}

impl SalesModel {
    /// Load and cross-check all four files.
    pub fn load(config: &DataConfig) -> Result<Self, DashError> {
        config.validate()?;

        let total = load_sales_csv(&config.data_dir.join(&config.total_file))?;
        let medical = load_sales_csv(&config.data_dir.join(&config.medical_file))?;
        let recreational = load_sales_csv(&config.data_dir.join(&config.recreational_file))?;

        let raw = read_csv_as_strings(&config.data_dir.join(&config.licensee_file))?;
        require_columns(&raw, &licensee::ALL)?;
        let directory = raw
            .lazy()
            .select(licensee::ALL.map(col))
            .collect()?;

        let companies = sales_columns(&total);
        tracing::debug!(dispensaries = companies.len(), "loaded sales data");

        // Every sales column must have a directory record.
        let known: HashSet<String> = directory
            .column(licensee::GLOBAL_ID)?
            .str()?
            .into_iter()
            .filter_map(|v| v.map(|s| s.trim().to_string()))
            .collect();
        for id in &companies {
            if !known.contains(id) {
                return Err(DashError::InvalidData(format!(
                    "Sales column '{id}' has no licensee record"
                )));
            }
        }

        // Keep only licensees that actually have sales data.
        let company_series = Series::new("companies".into(), companies);
        let licensees = directory
            .lazy()
            .filter(col(licensee::GLOBAL_ID).is_in(lit(company_series), false))
            .collect()?;

        Ok(Self {
            licensees,
            total,
            medical,
            recreational,
        })
    }

    pub fn sales_frame(&self, category: SalesCategory) -> &DataFrame {
        match category {
            SalesCategory::Total => &self.total,
            SalesCategory::Medical => &self.medical,
            SalesCategory::Recreational => &self.recreational,
        }
    }

    /// Dispensary ids present in the total-sales frame.
    pub fn dispensary_ids(&self) -> Vec<String> {
        sales_columns(&self.total)
    }

    /// Distinct cities in the working set, sorted.
    pub fn cities(&self) -> Result<Vec<String>, DashError> {
        let mut cities: Vec<String> = self
            .licensees
            .column(licensee::CITY)?
            .str()?
            .into_iter()
            .filter_map(|v| v.map(|s| s.trim().to_string()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        cities.sort();
        Ok(cities)
    }

    pub fn licensee_count(&self) -> usize {
        self.licensees.height()
    }

    /// Look up a single licensee by global id.
    pub fn licensee(&self, global_id: &str) -> Result<Licensee, DashError> {
        licensee_rows(&self.licensees)?
            .into_iter()
            .find(|l| l.global_id == global_id)
            .ok_or_else(|| DashError::MissingDispensary(global_id.to_string()))
    }

    /// All licensees sharing a city.
    pub fn licensees_in_city(&self, city: &str) -> Result<Vec<Licensee>, DashError> {
        Ok(licensee_rows(&self.licensees)?
            .into_iter()
            .filter(|l| l.city == city)
            .collect())
    }

    pub fn licensee_list(&self) -> Result<Vec<Licensee>, DashError> {
        licensee_rows(&self.licensees)
    }

    /// One dispensary's series for a category, restricted to rows with
    /// sales > 0. Two columns: sold_at plus the dispensary's id.
    pub fn series(
        &self,
        category: SalesCategory,
        global_id: &str,
    ) -> Result<DataFrame, DashError> {
        let frame = self.sales_frame(category);
        if frame.column(global_id).is_err() {
            return Err(DashError::MissingDispensary(global_id.to_string()));
        }
        let df = frame
            .clone()
            .lazy()
            .select([col(sales::SOLD_AT), col(global_id)])
            .filter(col(global_id).gt(lit(0.0)))
            .collect()?;
        Ok(df)
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
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

/// Load a sales CSV: parse sold_at as datetime, cast every other column
/// to Float64.
fn load_sales_csv(path: &Path) -> Result<DataFrame, DashError> {
    let raw = read_csv_as_strings(path)?;
    require_columns(&raw, &[sales::SOLD_AT])?;
    let df = parse_datetime_column(raw, sales::SOLD_AT, sales::DATE_FORMAT)?;

    let value_cols: Vec<Expr> = sales_columns(&df)
        .into_iter()
        .map(|c| col(c).cast(DataType::Float64))
        .collect();
    let df = df.lazy().with_columns(value_cols).collect()?;
    Ok(df)
}

/// Every column of a sales frame except the date index.
fn sales_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names_str()
        .iter()
        .filter(|c| **c != sales::SOLD_AT)
        .map(|c| c.to_string())
        .collect()
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), DashError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Parse a string column to Datetime using the given format string.
fn parse_datetime_column(
    df: DataFrame,
    column: &str,
    format: &str,
) -> Result<DataFrame, DashError> {
    let df = df
        .lazy()
        .with_columns([col(column)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .str()
            .to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                StrptimeOptions {
                    format: Some(format.into()),
                    strict: true,
                    ..Default::default()
                },
                lit("raise"),
            )])
        .collect()?;
    Ok(df)
}

fn licensee_rows(df: &DataFrame) -> Result<Vec<Licensee>, DashError> {
    let ids = df.column(licensee::GLOBAL_ID)?.str()?;
    let names = df.column(licensee::NAME)?.str()?;
    let addr1 = df.column(licensee::ADDRESS1)?.str()?;
    let addr2 = df.column(licensee::ADDRESS2)?.str()?;
    let cities = df.column(licensee::CITY)?.str()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(Licensee {
            global_id: ids.get(i).unwrap_or("").trim().to_string(),
            name: names.get(i).unwrap_or("").trim().to_string(),
            address1: addr1.get(i).unwrap_or("").trim().to_string(),
            address2: addr2.get(i).unwrap_or("").trim().to_string(),
            city: cities.get(i).unwrap_or("").trim().to_string(),
        });
    }
    Ok(rows)
}

// ── Test fixtures ───────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DATES: [&str; 5] = [
        "2020-01-01",
        "2020-01-02",
        "2020-01-15",
        "2020-02-01",
        "2020-03-01",
    ];

    const IDS: [&str; 6] = [
        "disp-001", "disp-002", "disp-003", "disp-004", "disp-005", "disp-006",
    ];

    fn sales_csv(rows: [[f64; 6]; 5]) -> String {
        let mut out = format!("sold_at,{}\n", IDS.join(","));
        for (date, row) in DATES.iter().zip(rows.iter()) {
            let values: Vec<String> = row.iter().map(|v| format!("{v:.2}")).collect();
            out.push_str(&format!("{},{}\n", date, values.join(",")));
        }
        out
    }

    /// Six dispensaries: three in Seattle, one alone in Spokane, two in
    /// Tacoma where only the selected one has any sales.
    pub(crate) fn write_fixture(dir: &Path) {
        let medical = [
            [40.0, 5.0, 0.0, 500.0, 10.0, 0.0],
            [0.0, 5.0, 0.0, 0.0, 0.0, 0.0],
            [20.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [80.0, 15.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 25.0, 0.0, 0.0, 0.0, 0.0],
        ];
        let recreational = [
            [60.0, 5.0, 0.0, 500.0, 0.0, 0.0],
            [0.0, 5.0, 0.0, 0.0, 0.0, 0.0],
            [30.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [120.0, 15.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 25.0, 0.0, 0.0, 0.0, 0.0],
        ];
        let mut total = [[0.0; 6]; 5];
        for r in 0..5 {
            for c in 0..6 {
                total[r][c] = medical[r][c] + recreational[r][c];
            }
        }

        fs::write(dir.join(files::TOTAL_SALES), sales_csv(total)).unwrap();
        fs::write(dir.join(files::MEDICAL_SALES), sales_csv(medical)).unwrap();
        fs::write(dir.join(files::RECREATIONAL_SALES), sales_csv(recreational)).unwrap();

        let licensees = "\
global_id,name,address1,address2,city,status
disp-001,Emerald Leaf,100 Pine St,,Seattle,active
disp-002,Green Gate,200 Pike St,Suite 4,Seattle,active
disp-003,Quiet Bud,300 Union St,,Seattle,active
disp-004,Lilac Station,10 Main Ave,,Spokane,active
disp-005,Harbor Haze,55 Dock St,,Tacoma,active
disp-006,Sound Garden,77 Bay St,,Tacoma,active
disp-099,Ghost Shop,1 Nowhere Rd,,Olympia,closed
";
        fs::write(dir.join(files::LICENSEES), licensees).unwrap();
    }

    pub(crate) fn model() -> (TempDir, SalesModel) {
        let dir = TempDir::new().unwrap();
        write_fixture(dir.path());
        let model = SalesModel::load(&DataConfig::new(dir.path())).unwrap();
        (dir, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_restricts_directory_to_sales_columns() {
        let (_dir, model) = fixtures::model();
        assert_eq!(model.dispensary_ids().len(), 6);
        // disp-099 has no sales column and is dropped from the working set.
        assert_eq!(model.licensee_count(), 6);
        assert!(matches!(
            model.licensee("disp-099"),
            Err(DashError::MissingDispensary(_))
        ));
    }

    #[test]
    fn loader_preserves_category_consistency() {
        let (_dir, model) = fixtures::model();
        for id in model.dispensary_ids() {
            let total = model.series(SalesCategory::Total, &id).unwrap();
            let dates = total.column(sales::SOLD_AT).unwrap().datetime().unwrap();
            let totals = total.column(&id).unwrap().f64().unwrap();

            let medical = model.sales_frame(SalesCategory::Medical);
            let recreational = model.sales_frame(SalesCategory::Recreational);
            let med_dates = medical
                .column(sales::SOLD_AT)
                .unwrap()
                .datetime()
                .unwrap();
            let med = medical.column(&id).unwrap().f64().unwrap();
            let rec = recreational.column(&id).unwrap().f64().unwrap();

            for i in 0..total.height() {
                let date = dates.phys.get(i).unwrap();
                let row = (0..medical.height())
                    .find(|&j| med_dates.phys.get(j) == Some(date))
                    .unwrap();
                let sum = med.get(row).unwrap() + rec.get(row).unwrap();
                assert!((totals.get(i).unwrap() - sum).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn series_drops_non_positive_rows() {
        let (_dir, model) = fixtures::model();
        let df = model.series(SalesCategory::Total, "disp-001").unwrap();
        assert_eq!(df.height(), 3);
        let values = df.column("disp-001").unwrap().f64().unwrap();
        for i in 0..df.height() {
            assert!(values.get(i).unwrap() > 0.0);
        }
    }

    #[test]
    fn unknown_dispensary_is_an_error() {
        let (_dir, model) = fixtures::model();
        assert!(matches!(
            model.series(SalesCategory::Total, "disp-404"),
            Err(DashError::MissingDispensary(_))
        ));
    }

    #[test]
    fn cities_are_distinct_and_sorted() {
        let (_dir, model) = fixtures::model();
        let cities = model.cities().unwrap();
        assert_eq!(cities, vec!["Seattle", "Spokane", "Tacoma"]);
    }

    #[test]
    fn missing_file_fails_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = SalesModel::load(&DataConfig::new(dir.path())).unwrap_err();
        assert!(matches!(err, DashError::InvalidData(_)));
    }
}
