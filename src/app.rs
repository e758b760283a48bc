use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::configuration::{
    FilterKeyword, HeadingConfig, ListingPreview, ProcessedFilters, Tag, encode_config,
    extract_filters, merge_texts_into_config, preview_listing, process_extracted_filters,
    resolve_configuration,
};
use crate::dataset::{Dataset, Row};
use crate::error::{FiltableError, Result};
use crate::filter::{
    Filter, FilterChange, FilterOptionsIndex, apply_filter, currently_selected_filters,
    enumerate_all_filter_options, generate_showing_results,
};
use crate::saving;
use crate::sheets::{self, SheetsClient};
use crate::source::{SourceKind, configure_path, listing_path};

type UploadCache = HashMap<String, Arc<Dataset>>;

/// Shared server state
///
/// Uploads never change once stored, so they are parsed once and cached by
/// key. Google Sheets are live documents and are fetched on every request.
pub struct AppState {
    config: AppConfig,
    sheets: SheetsClient,
    uploads: Mutex<UploadCache>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let sheets = SheetsClient::new(config.sheets_export_base.clone(), config.fetch_timeout())?;
        Ok(AppState {
            config,
            sheets,
            uploads: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn uploads(&self) -> MutexGuard<'_, UploadCache> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dataset of a source
    pub async fn dataset(&self, kind: SourceKind, id: &str) -> Result<Arc<Dataset>> {
        match kind {
            SourceKind::Csv => self.upload(id),
            SourceKind::Sheets => {
                let sheet = sheets::split_combined_id_and_gid(id)?;
                let dataset = self.sheets.fetch_dataset(&sheet).await?;
                info!("fetched sheet {} with {} rows", id, dataset.len());
                Ok(Arc::new(dataset))
            }
        }
    }

    fn upload(&self, key: &str) -> Result<Arc<Dataset>> {
        let cached = self.uploads().get(key).cloned();
        if let Some(dataset) = cached {
            return Ok(dataset);
        }

        let dataset = Arc::new(saving::load_upload(&self.config.upload_dir, key)?);
        info!("loaded upload {} with {} rows", key, dataset.len());
        self.uploads().insert(key.to_string(), Arc::clone(&dataset));
        Ok(dataset)
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl IntoResponse for FiltableError {
    fn into_response(self) -> Response {
        let status = match &self {
            FiltableError::Decode(_) | FiltableError::InvalidSheetsLink { .. } => {
                StatusCode::BAD_REQUEST
            }
            FiltableError::UploadNotFound { .. } | FiltableError::UnknownSourceKind { .. } => {
                StatusCode::NOT_FOUND
            }
            FiltableError::EmptyDataset
            | FiltableError::InvalidConfiguration
            | FiltableError::MissingConfiguration
            | FiltableError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FiltableError::Fetch(_) => StatusCode::BAD_GATEWAY,
            FiltableError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("request failed: {}", self);
        } else {
            warn!("request rejected: {}", self);
        }

        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(rename = "fileName")]
    file_name: String,
}

#[derive(Serialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "configurePath")]
    configure_path: String,
}

#[derive(Deserialize)]
struct LinkRequest {
    link: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse {
    id: String,
    gid: String,
    combined_id_and_gid: String,
    configure_path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetResponse<'a> {
    data: &'a [Row],
    headings: &'a [String],
    first_row: &'a Row,
    title: Option<&'a str>,
}

/// Body sent by the configuration wizard
#[derive(Deserialize)]
struct WizardRequest {
    configuration: HeadingConfig,
    /// Ordered `Text N` headings; when absent the configuration's own texts stand
    texts: Option<Vec<String>>,
}

impl WizardRequest {
    fn merged(&self) -> HeadingConfig {
        match &self.texts {
            Some(texts) => merge_texts_into_config(&self.configuration, texts),
            None => self.configuration.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    #[serde(flatten)]
    preview: ListingPreview,
    is_valid: bool,
    unknown_headings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    url_config: String,
    path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingRequest {
    url_config: Option<String>,
    #[serde(default)]
    filter: Filter,
    change: Option<FilterChange>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse<'a> {
    listing_title: Option<&'a str>,
    configuration: &'a HeadingConfig,
    processed_filters: &'a ProcessedFilters,
    filter_options: &'a FilterOptionsIndex,
    search_items: Vec<Tag>,
    filter: &'a Filter,
    selected: Vec<Vec<String>>,
    selected_tags: Vec<Tag>,
    filtered_data: Vec<&'a Row>,
    showing: String,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(serve_landing))
        .route("/api/upload", put(upload_csv))
        .route("/api/link", post(link_sheet))
        .route("/api/datasets/:kind/:id", get(get_dataset))
        .route("/api/datasets/:kind/:id/preview", post(preview_configuration))
        .route("/api/datasets/:kind/:id/publish", post(publish_configuration))
        .route("/api/datasets/:kind/:id/listing", post(evaluate_listing))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn upload_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let key = saving::save_upload(&state.config.upload_dir, &params.file_name, &body)?;
    let configure_path = configure_path(SourceKind::Csv, &key);
    Ok(Json(UploadResponse {
        key,
        configure_path,
    }))
}

async fn link_sheet(Json(payload): Json<LinkRequest>) -> Result<Json<LinkResponse>> {
    if !sheets::is_defined_link(&payload.link) {
        return Err(FiltableError::InvalidSheetsLink { link: payload.link });
    }

    let sheet = sheets::extract_id_and_gid(&payload.link)?;
    let combined = sheets::combined_id_and_gid(&sheet.id, &sheet.gid);
    Ok(Json(LinkResponse {
        configure_path: configure_path(SourceKind::Sheets, &combined),
        combined_id_and_gid: combined,
        id: sheet.id,
        gid: sheet.gid,
    }))
}

async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Response> {
    let kind: SourceKind = kind.parse()?;
    let dataset = state.dataset(kind, &id).await?;

    Ok(Json(DatasetResponse {
        data: dataset.rows(),
        headings: dataset.headings(),
        first_row: dataset.first_row(),
        title: dataset.title(),
    })
    .into_response())
}

fn warn_unknown_headings(configuration: &HeadingConfig, dataset: &Dataset, id: &str) {
    let unknown = configuration.unknown_headings(dataset.headings());
    if !unknown.is_empty() {
        warn!(
            "configuration for {} references unknown headings: {:?}",
            id, unknown
        );
    }
}

async fn preview_configuration(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<WizardRequest>,
) -> Result<Json<PreviewResponse>> {
    let kind: SourceKind = kind.parse()?;
    let dataset = state.dataset(kind, &id).await?;

    let merged = payload.merged();
    Ok(Json(PreviewResponse {
        preview: preview_listing(dataset.first_row(), &merged),
        is_valid: merged.is_publishable(),
        unknown_headings: merged.unknown_headings(dataset.headings()),
    }))
}

async fn publish_configuration(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<WizardRequest>,
) -> Result<Json<PublishResponse>> {
    let kind: SourceKind = kind.parse()?;
    let dataset = state.dataset(kind, &id).await?;

    let merged = payload.merged();
    merged.validate_for_publish()?;
    warn_unknown_headings(&merged, &dataset, &id);

    let url_config = encode_config(std::slice::from_ref(&merged));
    let path = listing_path(kind, &id, &url_config);
    info!("published listing {}", path);

    Ok(Json(PublishResponse { url_config, path }))
}

async fn evaluate_listing(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<ListingRequest>,
) -> Result<Response> {
    let kind: SourceKind = kind.parse()?;
    let configuration = resolve_configuration(payload.url_config.as_deref())?;
    let dataset = state.dataset(kind, &id).await?;
    warn_unknown_headings(&configuration, &dataset, &id);

    let processed_filters = process_extracted_filters(&extract_filters(&configuration));
    let filter_options = enumerate_all_filter_options(&dataset, &processed_filters);

    let mut filter = payload.filter;
    if let Some(change) = payload.change {
        filter.apply_change(change);
    }
    let filtered_data = apply_filter(&dataset, &filter);

    Ok(Json(ListingResponse {
        listing_title: configuration.listing_title().or(dataset.title()),
        configuration: &configuration,
        processed_filters: &processed_filters,
        filter_options: &filter_options,
        search_items: filter_options.items(FilterKeyword::Checkbox),
        filter: &filter,
        selected: currently_selected_filters(&filter),
        selected_tags: filter.selected_tags(),
        showing: generate_showing_results(filtered_data.len()),
        filtered_data,
    })
    .into_response())
}
