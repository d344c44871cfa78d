use crate::config::{Backend, Config};
use crate::error::{FormError, Result};
use crate::range::Range;
use crate::record::{HEADERS, Row};
use crate::sheets::SheetsClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Range-level access to a spreadsheet
///
/// This is the whole surface the record service needs: read a block, overwrite
/// a block, append rows under a table, and remove one row from a sheet.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Cell values inside `range`, trailing empty rows omitted.
    async fn read_range(&self, range: &Range) -> Result<Vec<Row>>;

    /// Overwrite cells starting at the top-left corner of `range`.
    async fn update_range(&self, range: &Range, values: Vec<Row>) -> Result<()>;

    /// Append `values` after the last row with data in `range`.
    async fn append_rows(&self, range: &Range, values: Vec<Row>) -> Result<()>;

    /// Remove the row at zero-based `row_index` of the sheet with id `sheet_id`,
    /// shifting the rows below it up by one.
    async fn delete_row(&self, sheet_id: i64, row_index: usize) -> Result<()>;
}

/// Build the store selected by `config.backend`.
///
/// The memory backend starts with a header row on the data sheet and an empty
/// dropdown sheet.
pub fn open(config: &Config) -> Result<Arc<dyn SheetStore>> {
    match config.backend {
        Backend::Sheets => Ok(Arc::new(SheetsClient::new(&config.sheets)?)),
        Backend::Memory => {
            let layout = &config.layout;
            let header: Row = HEADERS.iter().map(|h| h.to_string()).collect();
            let mut store = MemoryStore::new().with_sheet(
                &layout.data_sheet,
                layout.data_sheet_id,
                vec![header],
            );
            let dropdown = layout.dropdown()?;
            if dropdown.sheet != layout.data_sheet {
                store = store.with_sheet(&dropdown.sheet, layout.data_sheet_id + 1, Vec::new());
            }
            Ok(Arc::new(store))
        }
    }
}

struct MemorySheet {
    id: i64,
    rows: Vec<Row>,
}

/// A spreadsheet held in process memory
///
/// Follows the same range conventions as the remote service, so it stands in
/// for it in tests and in `memory` backend runs.
#[derive(Default)]
pub struct MemoryStore {
    sheets: RwLock<HashMap<String, MemorySheet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a sheet named `name` with numeric id `id`.
    pub fn with_sheet(self, name: &str, id: i64, rows: Vec<Row>) -> Self {
        self.sheets
            .write()
            .unwrap()
            .insert(name.to_string(), MemorySheet { id, rows });
        self
    }

    /// Every row currently stored on `name`, header included.
    pub fn snapshot(&self, name: &str) -> Vec<Row> {
        self.sheets
            .read()
            .unwrap()
            .get(name)
            .map(|s| s.rows.clone())
            .unwrap_or_default()
    }
}

fn missing_sheet(name: &str) -> FormError {
    FormError::Api {
        status: 400,
        message: format!("Unable to parse range: {}", name),
    }
}

fn last_non_empty(rows: &[Row]) -> usize {
    rows.iter()
        .rposition(|row| row.iter().any(|c| !c.is_empty()))
        .map_or(0, |i| i + 1)
}

fn put_cell(rows: &mut Vec<Row>, row: usize, col: usize, value: String) {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let target = &mut rows[row];
    if target.len() <= col {
        target.resize(col + 1, String::new());
    }
    target[col] = value;
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn read_range(&self, range: &Range) -> Result<Vec<Row>> {
        let sheets = self.sheets.read().unwrap();
        let sheet = sheets
            .get(&range.sheet)
            .ok_or_else(|| missing_sheet(&range.sheet))?;

        let first_row = range.first_row() as usize - 1;
        let first_col = range.first_col() as usize - 1;
        let used = last_non_empty(&sheet.rows);
        let end_row = range
            .last_row()
            .map_or(used, |r| (r as usize).min(used));

        let mut out: Vec<Row> = (first_row..end_row.max(first_row))
            .map(|r| {
                let row = &sheet.rows[r];
                let end_col = range
                    .last_col()
                    .map_or(row.len(), |c| (c as usize).min(row.len()));
                let mut cells: Row = row
                    .get(first_col..end_col.max(first_col))
                    .map(|c| c.to_vec())
                    .unwrap_or_default();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();

        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn update_range(&self, range: &Range, values: Vec<Row>) -> Result<()> {
        let mut sheets = self.sheets.write().unwrap();
        let sheet = sheets
            .get_mut(&range.sheet)
            .ok_or_else(|| missing_sheet(&range.sheet))?;

        let first_row = range.first_row() as usize - 1;
        let first_col = range.first_col() as usize - 1;
        for (r, row) in values.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                put_cell(&mut sheet.rows, first_row + r, first_col + c, value);
            }
        }
        Ok(())
    }

    async fn append_rows(&self, range: &Range, values: Vec<Row>) -> Result<()> {
        let mut sheets = self.sheets.write().unwrap();
        let sheet = sheets
            .get_mut(&range.sheet)
            .ok_or_else(|| missing_sheet(&range.sheet))?;

        let first_col = range.first_col() as usize - 1;
        let start = last_non_empty(&sheet.rows).max(range.first_row() as usize - 1);
        for (r, row) in values.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                put_cell(&mut sheet.rows, start + r, first_col + c, value);
            }
        }
        Ok(())
    }

    async fn delete_row(&self, sheet_id: i64, row_index: usize) -> Result<()> {
        let mut sheets = self.sheets.write().unwrap();
        let sheet = sheets
            .values_mut()
            .find(|s| s.id == sheet_id)
            .ok_or_else(|| FormError::Api {
                status: 400,
                message: format!("No grid with id: {}", sheet_id),
            })?;

        if row_index >= sheet.rows.len() {
            return Err(FormError::Api {
                status: 400,
                message: format!("Invalid requests[0].deleteDimension: row {} is out of range", row_index),
            });
        }
        sheet.rows.remove(row_index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_sheet(
            "Data",
            0,
            vec![
                row(&["id", "name", "qty"]),
                row(&["a", "Vase", "2"]),
                row(&["b", "Bowl", "5"]),
            ],
        )
    }

    #[tokio::test]
    async fn open_ended_range_skips_header() {
        let store = store();
        let rows = store
            .read_range(&Range::parse("Data!A2:C").unwrap())
            .await
            .unwrap();
        assert_eq!(rows, vec![row(&["a", "Vase", "2"]), row(&["b", "Bowl", "5"])]);
    }

    #[tokio::test]
    async fn column_range_returns_single_cells() {
        let store = store();
        let ids = store
            .read_range(&Range::parse("Data!A2:A").unwrap())
            .await
            .unwrap();
        assert_eq!(ids, vec![row(&["a"]), row(&["b"])]);
    }

    #[tokio::test]
    async fn range_past_data_is_empty() {
        let store = store();
        let rows = store
            .read_range(&Range::parse("Data!A10:C").unwrap())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn append_lands_after_last_row() {
        let store = store();
        store
            .append_rows(&Range::parse("Data!A2:C").unwrap(), vec![row(&["c", "Cup", "1"])])
            .await
            .unwrap();
        let all = store.snapshot("Data");
        assert_eq!(all.len(), 4);
        assert_eq!(all[3], row(&["c", "Cup", "1"]));
    }

    #[tokio::test]
    async fn append_to_empty_sheet_starts_at_range_row() {
        let store = MemoryStore::new().with_sheet("Data", 0, vec![row(&["id"])]);
        store
            .append_rows(&Range::parse("Data!A2:C").unwrap(), vec![row(&["x"])])
            .await
            .unwrap();
        assert_eq!(store.snapshot("Data"), vec![row(&["id"]), row(&["x"])]);
    }

    #[tokio::test]
    async fn update_overwrites_in_place() {
        let store = store();
        store
            .update_range(&Range::parse("Data!A2:C2").unwrap(), vec![row(&["a", "Jar", "9"])])
            .await
            .unwrap();
        assert_eq!(store.snapshot("Data")[1], row(&["a", "Jar", "9"]));
        assert_eq!(store.snapshot("Data").len(), 3);
    }

    #[tokio::test]
    async fn delete_shifts_rows_up() {
        let store = store();
        store.delete_row(0, 1).await.unwrap();
        assert_eq!(
            store.snapshot("Data"),
            vec![row(&["id", "name", "qty"]), row(&["b", "Bowl", "5"])]
        );
    }

    #[tokio::test]
    async fn memory_backend_starts_with_headers_only() {
        let mut config = Config::default();
        config.backend = Backend::Memory;
        let store = open(&config).unwrap();

        let header = store.read_range(&Range::parse("Data!A1:J1").unwrap()).await.unwrap();
        assert_eq!(header[0][0], HEADERS[0]);
        assert!(store.read_range(&config.layout.data_range()).await.unwrap().is_empty());
        assert!(store.read_range(&config.layout.dropdown().unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_sheet_and_bad_index_are_errors() {
        let store = store();
        assert!(store.read_range(&Range::parse("Nope!A1").unwrap()).await.is_err());
        assert!(store.delete_row(7, 1).await.is_err());
        assert!(store.delete_row(0, 99).await.is_err());
    }
}
