use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use brsr_extractor::{EsgRecord, Extractor, ExtractorConfig};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Shared application state. The extractor is absent when initialisation failed.
struct AppState {
    extractor: Option<Extractor>,
    init_error: Option<String>,
}

impl AppState {
    fn from_config(config: brsr_extractor::Result<ExtractorConfig>) -> Self {
        match config.and_then(Extractor::new) {
            Ok(extractor) => Self {
                extractor: Some(extractor),
                init_error: None,
            },
            Err(e) => {
                error!("Extractor not initialized: {}", e);
                Self {
                    extractor: None,
                    init_error: Some(e.to_string()),
                }
            }
        }
    }

    fn extractor(&self) -> Result<&Extractor, (StatusCode, String)> {
        self.extractor.as_ref().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Extractor not available: {}",
                    self.init_error.as_deref().unwrap_or("unknown error")
                ),
            )
        })
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    service: &'static str,
    extractor_loaded: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ExtractUrlForm {
    url: String,
}

async fn root(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let loaded = state.extractor.is_some();
    Json(StatusResponse {
        status: if loaded { "healthy" } else { "degraded" },
        service: "BRSR XBRL Extractor",
        extractor_loaded: loaded,
        error: state.init_error.clone(),
    })
}

async fn extract_url(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ExtractUrlForm>,
) -> Result<Json<Vec<EsgRecord>>, (StatusCode, String)> {
    info!("Received URL extraction request: {}", form.url);
    let extractor = state.extractor()?;

    let records = extractor.process_url(&form.url).await.map_err(|e| {
        error!("Error processing URL: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(records))
}

// Expects the document in a multipart field named `file`.
async fn extract_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<EsgRecord>>, (StatusCode, String)> {
    let extractor = state.extractor()?;
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        error!("Invalid upload: {}", e);
        (StatusCode::BAD_REQUEST, e.to_string())
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.xml").to_string();
        let content = field.bytes().await.map_err(bad_request)?;
        info!("Received file extraction request: {} ({} bytes)", filename, content.len());
        return Ok(Json(extractor.process_content(&content, &filename, None).await));
    }

    Err((StatusCode::BAD_REQUEST, "Missing 'file' field in upload".to_string()))
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/extract-url", post(extract_url))
        .route("/api/extract-file", post(extract_file))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let state = Arc::new(AppState::from_config(ExtractorConfig::from_env()));
    let app = router(state);

    let addr = std::env::var("BRSR_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
