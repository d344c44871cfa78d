use crate::error::{FormError, Result};
use crate::range::Range;
use crate::record::COLUMN_COUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

const ENV_PREFIX: &str = "FUREAI_";

/// Which storage the record service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Sheets over the v4 REST API
    #[default]
    Sheets,
    /// Process-local sheet, lost on exit
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sheets" => Ok(Backend::Sheets),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend `{}` (expected sheets or memory)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:3000".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// Connection settings for the spreadsheet API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsApiConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    /// OAuth bearer token with the spreadsheets scope
    pub access_token: Option<String>,
}

impl Default for SheetsApiConfig {
    fn default() -> Self {
        SheetsApiConfig {
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            spreadsheet_id: String::new(),
            access_token: None,
        }
    }
}

/// Where records live inside the spreadsheet
///
/// Row 1 of the data sheet holds headers; records start at `first_data_row`
/// and occupy columns A through J.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub data_sheet: String,
    /// Numeric sheet id used by structural requests such as row deletion
    pub data_sheet_id: i64,
    pub first_data_row: u32,
    pub dropdown_range: String,
    pub recent_limit: usize,
    /// chrono format string for the last-modified column
    pub timestamp_format: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            data_sheet: "Data".to_string(),
            data_sheet_id: 0,
            first_data_row: 2,
            dropdown_range: "Helpers!A1:A195".to_string(),
            recent_limit: 10,
            timestamp_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
        }
    }
}

impl SheetLayout {
    /// Every record row, e.g. `Data!A2:J`.
    pub fn data_range(&self) -> Range {
        self.tail_range(self.first_data_row)
    }

    /// Records from `start_row` to the end of the data.
    pub fn tail_range(&self, start_row: u32) -> Range {
        Range::rows(&self.data_sheet, 1, start_row, COLUMN_COUNT, None)
    }

    /// The id column, e.g. `Data!A2:A`.
    pub fn id_range(&self) -> Range {
        Range::rows(&self.data_sheet, 1, self.first_data_row, 1, None)
    }

    /// Sheet row number (1-based) of the record at `offset`.
    pub fn data_row(&self, offset: usize) -> Result<u32> {
        u32::try_from(offset)
            .ok()
            .and_then(|offset| self.first_data_row.checked_add(offset))
            .ok_or_else(|| {
                FormError::InvalidRange(format!(
                    "data offset {} is beyond the last sheet row",
                    offset
                ))
            })
    }

    /// The single row holding the record at `offset` within the data range.
    pub fn record_range(&self, offset: usize) -> Result<Range> {
        let row = self.data_row(offset)?;
        Ok(Range::rows(&self.data_sheet, 1, row, COLUMN_COUNT, Some(row)))
    }

    /// Zero-based sheet row index of the record at `offset`, as used by
    /// dimension requests.
    pub fn sheet_row_index(&self, offset: usize) -> usize {
        (self.first_data_row - 1) as usize + offset
    }

    pub fn dropdown(&self) -> Result<Range> {
        Range::parse(&self.dropdown_range)
    }
}

/// Application configuration
///
/// Built from defaults, then an optional TOML file, then `FUREAI_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: Backend,
    pub sheets: SheetsApiConfig,
    pub layout: SheetLayout,
}

impl Config {
    /// Load configuration for the running process.
    ///
    /// A `.env` file in the working directory is read first if present. The
    /// result is not validated, so callers can still apply their own overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        check_dotenv(dotenvy::dotenv())?;

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            FormError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FormError::Config(e.to_string()))
    }

    /// Override fields from variables found by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = var("BIND") {
            self.server.bind = v;
        }
        if let Some(v) = var("STATIC_DIR") {
            self.server.static_dir = v;
        }
        if let Some(v) = var("BACKEND") {
            self.backend = v.parse().map_err(FormError::Config)?;
        }
        if let Some(v) = var("SHEETS_BASE_URL") {
            self.sheets.base_url = v;
        }
        if let Some(v) = var("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = v;
        }
        if let Some(v) = var("ACCESS_TOKEN") {
            self.sheets.access_token = Some(v);
        }
        if let Some(v) = var("DATA_SHEET") {
            self.layout.data_sheet = v;
        }
        if let Some(v) = var("DATA_SHEET_ID") {
            self.layout.data_sheet_id = parse_number("DATA_SHEET_ID", &v)?;
        }
        if let Some(v) = var("FIRST_DATA_ROW") {
            self.layout.first_data_row = parse_number("FIRST_DATA_ROW", &v)?;
        }
        if let Some(v) = var("DROPDOWN_RANGE") {
            self.layout.dropdown_range = v;
        }
        if let Some(v) = var("RECENT_LIMIT") {
            self.layout.recent_limit = parse_number("RECENT_LIMIT", &v)?;
        }
        if let Some(v) = var("TIMESTAMP_FORMAT") {
            self.layout.timestamp_format = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout.data_sheet.is_empty() {
            return Err(FormError::Config("layout.data_sheet is empty".into()));
        }
        if self.layout.first_data_row == 0 {
            return Err(FormError::Config("layout.first_data_row starts at 1".into()));
        }
        if self.layout.recent_limit == 0 {
            return Err(FormError::Config("layout.recent_limit must be positive".into()));
        }
        self.layout.dropdown()?;

        if self.backend == Backend::Sheets {
            if self.sheets.spreadsheet_id.is_empty() {
                return Err(FormError::Config(format!(
                    "sheets backend needs a spreadsheet id ({}SPREADSHEET_ID)",
                    ENV_PREFIX
                )));
            }
            if self.sheets.access_token.as_deref().unwrap_or("").is_empty() {
                return Err(FormError::Config(format!(
                    "sheets backend needs an access token ({}ACCESS_TOKEN)",
                    ENV_PREFIX
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        FormError::Config(format!("{}{} is not a number: {}", ENV_PREFIX, name, value))
    })
}

/// A missing `.env` is fine, a malformed one is not.
fn check_dotenv<T>(result: dotenvy::Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FormError::Config(format!("cannot load .env: {}", e))),
    }
}
