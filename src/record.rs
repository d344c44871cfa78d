use serde::{Deserialize, Deserializer, Serialize};

/// A raw spreadsheet row, one string per cell.
pub type Row = Vec<String>;

/// Number of columns a record occupies (A..J).
pub const COLUMN_COUNT: u32 = 10;

/// Header labels written above the data, in column order.
pub const HEADERS: [&str; COLUMN_COUNT as usize] = [
    "Record ID",
    "Name",
    "Origin",
    "Country of Origin",
    "Condition",
    "Price",
    "Quantity",
    "Category",
    "Description",
    "Last Modified",
];

/// Field set posted by the entry form
///
/// Every field except the id maps to one column of the record row. Price and
/// quantity are kept as text because that is how the sheet hands them back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordForm {
    /// Id of the record being edited, absent or empty for a new record
    #[serde(default, deserialize_with = "optional_cell")]
    pub rec_id: Option<String>,

    #[serde(default, deserialize_with = "cell")]
    pub name: String,

    #[serde(default, deserialize_with = "cell")]
    pub origin: String,

    #[serde(default, deserialize_with = "cell")]
    pub country_of_origin: String,

    #[serde(default, deserialize_with = "cell")]
    pub condition: String,

    #[serde(default, deserialize_with = "cell")]
    pub price: String,

    #[serde(default, deserialize_with = "cell")]
    pub quantity: String,

    #[serde(default, deserialize_with = "cell")]
    pub category: String,

    #[serde(default, deserialize_with = "cell")]
    pub description: String,
}

impl RecordForm {
    /// The submitted id, if it is non-blank.
    pub fn id(&self) -> Option<&str> {
        self.rec_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Build the full row for `id`, stamped with `timestamp`.
    pub fn to_row(&self, id: &str, timestamp: &str) -> Row {
        vec![
            id.to_string(),
            self.name.clone(),
            self.origin.clone(),
            self.country_of_origin.clone(),
            self.condition.clone(),
            self.price.clone(),
            self.quantity.clone(),
            self.category.clone(),
            self.description.clone(),
            timestamp.to_string(),
        ]
    }

    /// Rebuild a form from a stored row, so a record can be loaded for editing.
    /// Missing trailing cells come back empty.
    pub fn from_row(row: &[String]) -> Self {
        let at = |i: usize| row.get(i).cloned().unwrap_or_default();
        let id = at(0);
        RecordForm {
            rec_id: if id.is_empty() { None } else { Some(id) },
            name: at(1),
            origin: at(2),
            country_of_origin: at(3),
            condition: at(4),
            price: at(5),
            quantity: at(6),
            category: at(7),
            description: at(8),
        }
    }
}

/// Search box payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchForm {
    #[serde(default, alias = "searchtext")]
    pub search_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl From<CellValue> for String {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Text(s) => s,
            CellValue::Integer(n) => n.to_string(),
            CellValue::Float(n) => n.to_string(),
            CellValue::Flag(b) => b.to_string(),
        }
    }
}

// Accept numbers as well as strings, since the form posts price and quantity as numbers.
fn cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<CellValue>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn optional_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<CellValue>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_fields_are_accepted_as_text() {
        let form: RecordForm = serde_json::from_value(json!({
            "name": "Vase",
            "price": 10,
            "quantity": 2,
            "countryOfOrigin": "JP",
        }))
        .unwrap();

        assert_eq!(form.name, "Vase");
        assert_eq!(form.price, "10");
        assert_eq!(form.quantity, "2");
        assert_eq!(form.country_of_origin, "JP");
        assert_eq!(form.rec_id, None);
        assert_eq!(form.description, "");
    }

    #[test]
    fn blank_id_counts_as_missing() {
        let form: RecordForm = serde_json::from_value(json!({ "recId": "   " })).unwrap();
        assert_eq!(form.id(), None);

        let form: RecordForm = serde_json::from_value(json!({ "recId": null })).unwrap();
        assert_eq!(form.id(), None);

        let form: RecordForm = serde_json::from_value(json!({ "recId": " abc " })).unwrap();
        assert_eq!(form.id(), Some("abc"));
    }

    #[test]
    fn row_layout_matches_headers() {
        let form = RecordForm {
            name: "Teapot".into(),
            category: "Ceramics".into(),
            ..Default::default()
        };
        let row = form.to_row("id-1", "1/2/2026, 3:04:05 PM");

        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[0], "id-1");
        assert_eq!(row[1], "Teapot");
        assert_eq!(row[7], "Ceramics");
        assert_eq!(row[9], "1/2/2026, 3:04:05 PM");
    }

    #[test]
    fn short_rows_load_with_empty_fields() {
        let row = vec!["id-9".to_string(), "Bowl".to_string()];
        let form = RecordForm::from_row(&row);
        assert_eq!(form.id(), Some("id-9"));
        assert_eq!(form.name, "Bowl");
        assert_eq!(form.price, "");
    }

    #[test]
    fn search_text_uses_camel_case_key() {
        let search: SearchForm = serde_json::from_value(json!({ "searchText": "Vase" })).unwrap();
        assert_eq!(search.search_text, "Vase");

        let search: SearchForm = serde_json::from_value(json!({ "searchtext": "Bowl" })).unwrap();
        assert_eq!(search.search_text, "Bowl");

        let search: SearchForm = serde_json::from_value(json!({})).unwrap();
        assert_eq!(search.search_text, "");
    }
}
