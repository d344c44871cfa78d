use crate::config::SheetLayout;
use crate::error::{FormError, Result};
use crate::range::Range;
use crate::record::{RecordForm, Row};
use crate::store::SheetStore;
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Record operations over a spreadsheet
///
/// Holds no record state of its own. Every call re-reads the ranges it needs,
/// so the sheet stays the only source of truth.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn SheetStore>,
    layout: SheetLayout,
    clock: Clock,
}

impl RecordService {
    pub fn new(store: Arc<dyn SheetStore>, layout: SheetLayout) -> Self {
        RecordService {
            store,
            layout,
            clock: Arc::new(Local::now),
        }
    }

    /// Replace the time source used for the last-modified column.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    fn timestamp(&self) -> String {
        (self.clock)()
            .format(&self.layout.timestamp_format)
            .to_string()
    }

    /// Save a submitted form and return the trailing-records view.
    ///
    /// A non-empty id that exists in the sheet overwrites that row; anything
    /// else creates a new record.
    pub async fn process_form(&self, form: &RecordForm) -> Result<Vec<Row>> {
        let existing = match form.id() {
            Some(id) => self.check_id(id).await?.then_some(id),
            None => None,
        };
        match existing {
            Some(id) => self.update_record(id, form).await?,
            None => {
                self.create_record(form).await?;
            }
        }
        self.last_ten_rows().await
    }

    /// Append a new record under a fresh id and return that id.
    pub async fn create_record(&self, form: &RecordForm) -> Result<String> {
        let existing = self.ids().await?;
        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !existing.contains(&candidate) {
                break candidate;
            }
        };

        let row = form.to_row(&id, &self.timestamp());
        self.store
            .append_rows(&self.layout.data_range(), vec![row])
            .await?;
        info!("created record {}", id);
        Ok(id)
    }

    /// Overwrite every column of the record `id` with `form`.
    pub async fn update_record(&self, id: &str, form: &RecordForm) -> Result<()> {
        let offset = self
            .row_offset_by_id(id)
            .await?
            .ok_or_else(|| FormError::RecordNotFound(id.to_string()))?;

        let row = form.to_row(id, &self.timestamp());
        self.store
            .update_range(&self.layout.record_range(offset)?, vec![row])
            .await?;
        info!("updated record {} at data offset {}", id, offset);
        Ok(())
    }

    /// Raw cell values of `range`.
    pub async fn read_record(&self, range: &Range) -> Result<Vec<Row>> {
        self.store.read_range(range).await
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let column = self.store.read_range(&self.layout.id_range()).await?;
        Ok(column
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    /// Zero-based offset of `id` within the data range, scanning top to bottom.
    pub async fn row_offset_by_id(&self, id: &str) -> Result<Option<usize>> {
        if id.is_empty() {
            return Err(FormError::MissingId);
        }
        let offset = self.ids().await?.iter().position(|cell| cell == id);
        debug!("id {} resolved to offset {:?}", id, offset);
        Ok(offset)
    }

    /// Whether `id` is present in the id column.
    pub async fn check_id(&self, id: &str) -> Result<bool> {
        Ok(self.ids().await?.iter().any(|cell| cell == id))
    }

    /// Delete the record `id` and return the trailing-records view.
    pub async fn delete_record(&self, id: &str) -> Result<Vec<Row>> {
        let id = id.trim();
        let offset = match self.row_offset_by_id(id).await? {
            Some(offset) => offset,
            None => {
                warn!("delete requested for unknown record {}", id);
                return Err(FormError::RecordNotFound(id.to_string()));
            }
        };

        let row_index = self.layout.sheet_row_index(offset);
        self.store
            .delete_row(self.layout.data_sheet_id, row_index)
            .await?;
        info!("deleted record {} (sheet row index {})", id, row_index);
        self.last_ten_rows().await
    }

    /// The last `recent_limit` data rows, oldest first.
    pub async fn last_ten_rows(&self) -> Result<Vec<Row>> {
        let count = self.store.read_range(&self.layout.data_range()).await?.len();
        let limit = self.layout.recent_limit;

        let range = if count <= limit {
            self.layout.data_range()
        } else {
            self.layout.tail_range(self.layout.data_row(count - limit)?)
        };
        debug!("trailing view of {} rows uses {}", count, range);
        self.store.read_range(&range).await
    }

    /// Every data row.
    pub async fn all_records(&self) -> Result<Vec<Row>> {
        self.store.read_range(&self.layout.data_range()).await
    }

    /// The row for `id`, if it exists.
    pub async fn record_by_id(&self, id: &str) -> Result<Option<Row>> {
        let Some(offset) = self.row_offset_by_id(id.trim()).await? else {
            return Ok(None);
        };
        let rows = self
            .store
            .read_range(&self.layout.record_range(offset)?)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Rows with at least one cell containing `text`, ignoring case.
    ///
    /// The text is matched as given, surrounding whitespace included.
    pub async fn search_records(&self, text: &str) -> Result<Vec<Row>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let needle = text.to_lowercase();
        let rows = self.store.read_range(&self.layout.data_range()).await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| cell.to_lowercase().contains(&needle)))
            .collect())
    }

    /// Values of the dropdown range, flattened, blanks dropped.
    pub async fn dropdown_list(&self) -> Result<Vec<String>> {
        let rows = self.store.read_range(&self.layout.dropdown()?).await?;
        Ok(rows
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HEADERS;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn header() -> Row {
        HEADERS.iter().map(|h| h.to_string()).collect()
    }

    fn form(name: &str) -> RecordForm {
        RecordForm {
            name: name.to_string(),
            price: "10".into(),
            quantity: "2".into(),
            country_of_origin: "JP".into(),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<MemoryStore>, RecordService) {
        let store = Arc::new(
            MemoryStore::new()
                .with_sheet("Data", 0, vec![header()])
                .with_sheet(
                    "Helpers",
                    1,
                    vec![vec!["Japan".into()], vec!["".into()], vec!["Korea".into()]],
                ),
        );
        let service = RecordService::new(store.clone(), SheetLayout::default()).with_clock(|| {
            Local.with_ymd_and_hms(2026, 3, 4, 15, 6, 7).unwrap()
        });
        (store, service)
    }

    async fn seed(service: &RecordService, count: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for i in 0..count {
            ids.push(service.create_record(&form(&format!("Item {}", i))).await.unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn create_appends_row_with_fresh_id_and_timestamp() {
        let (store, service) = setup();
        let view = service.process_form(&form("Vase")).await.unwrap();

        assert_eq!(view.len(), 1);
        let row = &view[0];
        assert_eq!(Uuid::parse_str(&row[0]).unwrap().get_version_num(), 4);
        assert_eq!(row[1], "Vase");
        assert_eq!(row[3], "JP");
        assert_eq!(row[5], "10");
        assert_eq!(row[9], "3/4/2026, 3:06:07 PM");
        assert_eq!(store.snapshot("Data")[0], header());
    }

    #[tokio::test]
    async fn unknown_id_creates_instead_of_updating() {
        let (store, service) = setup();
        seed(&service, 1).await;

        let mut submitted = form("Ghost");
        submitted.rec_id = Some("not-a-real-id".into());
        service.process_form(&submitted).await.unwrap();

        let rows = store.snapshot("Data");
        assert_eq!(rows.len(), 3);
        assert_ne!(rows[2][0], "not-a-real-id");
        assert_eq!(rows[2][1], "Ghost");
    }

    #[tokio::test]
    async fn update_replaces_fields_in_place() {
        let (store, service) = setup();
        let ids = seed(&service, 3).await;

        let service = service.with_clock(|| Local.with_ymd_and_hms(2026, 5, 6, 9, 0, 0).unwrap());
        let mut edit = RecordForm {
            name: "Teapot".into(),
            ..Default::default()
        };
        edit.rec_id = Some(ids[1].clone());
        service.process_form(&edit).await.unwrap();

        let rows = store.snapshot("Data");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2][0], ids[1]);
        assert_eq!(rows[2][1], "Teapot");
        assert_eq!(rows[2][3], "");
        assert_eq!(rows[2][9], "5/6/2026, 9:00:00 AM");
        assert_eq!(rows[1][1], "Item 0");
        assert_eq!(rows[3][1], "Item 2");
    }

    #[tokio::test]
    async fn update_of_missing_id_is_not_found() {
        let (_, service) = setup();
        let err = service.update_record("nope", &form("x")).await.unwrap_err();
        assert!(matches!(err, FormError::RecordNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn offsets_are_zero_based_within_data() {
        let (_, service) = setup();
        let ids = seed(&service, 3).await;

        assert_eq!(service.row_offset_by_id(&ids[0]).await.unwrap(), Some(0));
        assert_eq!(service.row_offset_by_id(&ids[2]).await.unwrap(), Some(2));
        assert_eq!(service.row_offset_by_id("missing").await.unwrap(), None);
        assert!(service.check_id(&ids[1]).await.unwrap());
        assert!(!service.check_id("missing").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_row() {
        let (store, service) = setup();
        let ids = seed(&service, 3).await;

        let view = service.delete_record(&ids[1]).await.unwrap();
        assert_eq!(view.len(), 2);

        let rows = store.snapshot("Data");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], ids[0]);
        assert_eq!(rows[2][0], ids[2]);
        assert!(!service.check_id(&ids[1]).await.unwrap());
        assert_eq!(service.row_offset_by_id(&ids[2]).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn delete_without_or_with_unknown_id_fails_cleanly() {
        let (store, service) = setup();
        seed(&service, 2).await;

        assert!(matches!(
            service.delete_record("").await,
            Err(FormError::MissingId)
        ));
        assert!(matches!(
            service.delete_record("missing").await,
            Err(FormError::RecordNotFound(_))
        ));
        assert_eq!(store.snapshot("Data").len(), 3);
    }

    #[tokio::test]
    async fn trailing_view_caps_at_ten_and_skips_header() {
        let (_, service) = setup();
        let ids = seed(&service, 14).await;

        let view = service.last_ten_rows().await.unwrap();
        assert_eq!(view.len(), 10);
        assert_eq!(view[0][0], ids[4]);
        assert_eq!(view[9][0], ids[13]);
        assert!(view.iter().all(|row| row[0] != HEADERS[0]));
    }

    #[tokio::test]
    async fn trailing_view_with_exactly_ten_rows_returns_all() {
        let (_, service) = setup();
        let ids = seed(&service, 10).await;

        let view = service.last_ten_rows().await.unwrap();
        assert_eq!(view.len(), 10);
        assert_eq!(view[0][0], ids[0]);
    }

    #[tokio::test]
    async fn trailing_view_of_empty_sheet_is_empty() {
        let (_, service) = setup();
        assert!(service.last_ten_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_returns_rows_once() {
        let (_, service) = setup();
        seed(&service, 3).await;
        let mut special = form("Blue Celadon Vase");
        special.description = "celadon glaze".into();
        let id = service.create_record(&special).await.unwrap();

        let hits = service.search_records("CELADON").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0][0], id);

        assert!(service.search_records("").await.unwrap().is_empty());
        assert_eq!(service.search_records(" vase").await.unwrap().len(), 1);
        assert!(service.search_records("vase ").await.unwrap().is_empty());
        assert!(service.search_records("zzz").await.unwrap().is_empty());
        assert_eq!(service.search_records("item").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lookup_by_id_reads_single_row() {
        let (_, service) = setup();
        let ids = seed(&service, 2).await;

        let row = service.record_by_id(&ids[1]).await.unwrap().unwrap();
        assert_eq!(RecordForm::from_row(&row).name, "Item 1");
        assert_eq!(service.record_by_id("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropdown_values_are_flattened_without_blanks() {
        let (_, service) = setup();
        assert_eq!(service.dropdown_list().await.unwrap(), vec!["Japan", "Korea"]);
    }

    #[tokio::test]
    async fn store_failures_surface_as_errors() {
        let store = Arc::new(MemoryStore::new());
        let service = RecordService::new(store, SheetLayout::default());

        assert!(service.process_form(&form("x")).await.is_err());
        assert!(service.search_records("x").await.is_err());
    }
}
