use crate::config::SheetsApiConfig;
use crate::error::{FormError, Result};
use crate::range::Range;
use crate::record::Row;
use crate::store::SheetStore;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

/// Google Sheets v4 client for one spreadsheet
///
/// Values are written with `RAW`, so cells keep exactly the submitted text:
/// nothing is parsed as a formula, date or number.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl SheetsClient {
    pub fn new(config: &SheetsApiConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FormError::Config("missing sheets access token".into()))?;

        Ok(SheetsClient {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token,
        })
    }

    fn values_url(&self, range: &Range, suffix: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(&range.to_string()),
            suffix
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.base_url, self.spreadsheet_id
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(FormError::Api {
            status,
            message: api_error_message(&text),
        })
    }
}

/// Pull the human-readable message out of an API error body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.to_string(),
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_value_range(body: &str) -> Result<Vec<Row>> {
    let parsed: ValueRange = serde_json::from_str(body)?;
    Ok(parsed
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

/// `batchUpdate` body removing a single row.
fn delete_row_request(sheet_id: i64, row_index: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row_index,
                    "endIndex": row_index + 1,
                }
            }
        }]
    })
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn read_range(&self, range: &Range) -> Result<Vec<Row>> {
        debug!("reading {}", range);
        let response = self.send(self.http.get(self.values_url(range, ""))).await?;
        let body = response.text().await?;
        parse_value_range(&body)
    }

    async fn update_range(&self, range: &Range, values: Vec<Row>) -> Result<()> {
        debug!("updating {} ({} rows)", range, values.len());
        let url = self.values_url(range, "?valueInputOption=RAW");
        let body = json!({
            "range": range.to_string(),
            "majorDimension": "ROWS",
            "values": values,
        });
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }

    async fn append_rows(&self, range: &Range, values: Vec<Row>) -> Result<()> {
        debug!("appending {} rows to {}", values.len(), range);
        let url = self.values_url(
            range,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        let body = json!({
            "majorDimension": "ROWS",
            "values": values,
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_row(&self, sheet_id: i64, row_index: usize) -> Result<()> {
        debug!("deleting row index {} of sheet {}", row_index, sheet_id);
        let body = delete_row_request(sheet_id, row_index);
        self.send(self.http.post(self.batch_update_url()).json(&body))
            .await?;
        Ok(())
    }
}
