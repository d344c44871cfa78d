use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::error::FormError;
use crate::record::{RecordForm, Row, SearchForm};
use crate::render::FormPage;
use crate::service::RecordService;
use crate::store;

const PAGE_TITLE: &str = "Inventory";

pub struct AppState {
    service: RecordService,
    page: FormPage,
}

impl AppState {
    pub fn new(service: RecordService) -> Result<Self, FormError> {
        Ok(AppState {
            service,
            page: FormPage::new()?,
        })
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let code = match &self {
            FormError::MissingId => StatusCode::BAD_REQUEST,
            FormError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if code.is_client_error() {
            warn!("request rejected ({}): {}", code, self);
        } else {
            error!("request failed ({}): {}", code, self);
        }

        (
            code,
            Json(ErrorResponse {
                status: "error".to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(serve_form))
        .route("/api/records", post(submit_form).get(all_records))
        .route("/api/records/recent", get(recent_records))
        .route("/api/records/:id", get(get_record).delete(delete_record))
        .route("/api/search", post(search_records))
        .route("/api/dropdown", get(dropdown_list))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = store::open(&config)?;
    let service = RecordService::new(store, config.layout.clone());
    let state = Arc::new(AppState::new(service)?);

    let app = router(state, &config.server.static_dir);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(
        "Listening on http://{} ({:?} backend)",
        config.server.bind, config.backend
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_form(State(state): State<Arc<AppState>>) -> Result<Html<String>, FormError> {
    // A broken dropdown range should not take the whole form down.
    let options = state.service.dropdown_list().await.unwrap_or_else(|e| {
        error!("dropdown list unavailable: {}", e);
        Vec::new()
    });
    Ok(Html(state.page.render(PAGE_TITLE, &options)?))
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RecordForm>,
) -> Result<Json<Vec<Row>>, FormError> {
    Ok(Json(state.service.process_form(&form).await?))
}

async fn recent_records(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Row>>, FormError> {
    Ok(Json(state.service.last_ten_rows().await?))
}

async fn all_records(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Row>>, FormError> {
    Ok(Json(state.service.all_records().await?))
}

async fn get_record(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Row>, FormError> {
    match state.service.record_by_id(&id).await? {
        Some(row) => Ok(Json(row)),
        None => Err(FormError::RecordNotFound(id)),
    }
}

async fn delete_record(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Row>>, FormError> {
    Ok(Json(state.service.delete_record(&id).await?))
}

async fn search_records(
    State(state): State<Arc<AppState>>,
    Json(search): Json<SearchForm>,
) -> Result<Json<Vec<Row>>, FormError> {
    Ok(Json(state.service.search_records(&search.search_text).await?))
}

async fn dropdown_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, FormError> {
    Ok(Json(state.service.dropdown_list().await?))
}
