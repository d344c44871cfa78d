/*!
# Fureai inventory form

A data-entry web form that keeps its records in a spreadsheet.

## Overview

Each record is one row of a data sheet: a generated id, eight editable
fields, and a last-modified timestamp. The program keeps no copy of the data;
every operation reads or writes spreadsheet ranges through a [`SheetStore`],
either the Google Sheets v4 API or an in-memory sheet.

## Architecture

### Web layer (`web` feature)
- **Form renderer** - Serves the entry page with the country dropdown filled in
- **API routes** - JSON endpoints for submit, lookup, delete, search

### Record service
- **Writer** - Overwrites a row when the submitted id exists, appends otherwise
- **Identifier index** - Linear scan of the id column
- **Deleter** - Removes exactly one row by id
- **Recency view** - The last ten data rows, returned after every change
- **Search** - Case-insensitive substring match over every cell

### Storage
- `Sheet!A1:B2` ranges, see [`range`]
- [`sheets::SheetsClient`] for the remote spreadsheet, [`store::MemoryStore`] for local runs

## REST API Endpoints

- `GET /` - Entry form
- `POST /api/records` - Save a form, returns the last ten rows
- `GET /api/records`, `GET /api/records/recent` - All rows / last ten rows
- `GET /api/records/{id}`, `DELETE /api/records/{id}` - One record
- `POST /api/search` - Rows matching `searchText`
- `GET /api/dropdown` - Dropdown values
*/

#[cfg(feature = "web")]
pub mod app;
pub mod config;
pub mod error;
pub mod range;
pub mod record;
#[cfg(feature = "web")]
pub mod render;
pub mod service;
pub mod sheets;
pub mod store;

pub use config::{Backend, Config, SheetLayout};
pub use error::{FormError, Result};
pub use range::Range;
pub use record::{RecordForm, Row};
pub use service::RecordService;
pub use store::{MemoryStore, SheetStore};
