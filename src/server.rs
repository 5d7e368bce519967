use crate::config::{Config, ServerConfig};
use crate::contact::{
    Attachment, ContactError, ContactResponse, ContactService, ContactSubmission, ValidationError,
};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub struct AppState {
    pub contact: ContactService,
}

pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();
    if !origins.is_empty() {
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    Router::new()
        .route("/api/contact", post(contact_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    log::info!("Initializing state...");
    let state = Arc::new(AppState {
        contact: ContactService::from_config(&config),
    });

    let app = router(state, &config.server);

    let address = config.bind_address();
    log::info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    log::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn contact_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ContactResponse>, ContactError> {
    let mut multipart =
        multipart.map_err(|e| ValidationError::MalformedPayload(e.body_text()))?;
    let submission = read_submission(&mut multipart).await?;

    let response = state.contact.submit(&submission).await?;
    Ok(Json(response))
}

fn malformed(e: MultipartError) -> ValidationError {
    ValidationError::MalformedPayload(e.body_text())
}

/// Collects the contact form fields. Unknown fields are skipped and an empty
/// file input (no name, no bytes) does not count as an attachment.
pub async fn read_submission(
    multipart: &mut Multipart,
) -> Result<ContactSubmission, ValidationError> {
    let mut submission = ContactSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "fullName" => submission.full_name = field.text().await.map_err(malformed)?,
            "phone" => submission.phone = field.text().await.map_err(malformed)?,
            "email" => submission.email = field.text().await.map_err(malformed)?,
            "message" => submission.message = field.text().await.map_err(malformed)?,
            "gdprConsent" => submission.gdpr_consent = field.text().await.map_err(malformed)?,
            "attachments" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(malformed)?;

                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                let filename = if filename.is_empty() {
                    "attachment".to_string()
                } else {
                    filename
                };

                submission.attachments.push(Attachment::new(
                    &filename,
                    content_type.as_deref(),
                    data.to_vec(),
                ));
            }
            other => log::debug!("Ignoring unexpected form field: {other}"),
        }
    }

    Ok(submission)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
