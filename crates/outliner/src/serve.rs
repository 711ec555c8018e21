use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::prelude::*;
use crate::prelude::eprintln;

#[derive(Debug, clap::Parser)]
#[command(name = "serve")]
#[command(about = "Serve outline extraction over HTTP")]
pub struct App {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value = "5000")]
    pub port: u16,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let addr = format!("{}:{}", app.host, app.port);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/extract-outline", post(handle_extract_outline))
        .layer(cors);

    if global.verbose {
        eprintln!("Outline service listening on http://{addr}");
        eprintln!("Extraction endpoint: http://{addr}/extract-outline");
    }
    log::info!("listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("failed to bind to {addr}: {e}"))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| eyre!("server error: {e}"))?;

    Ok(())
}

type ApiResponse = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: String) -> ApiResponse {
    (status, Json(serde_json::json!({ "error": message })))
}

fn is_pdf_filename(filename: &str) -> bool {
    !filename.is_empty() && filename.to_lowercase().ends_with(".pdf")
}

/// `POST /extract-outline`: multipart upload with a `file` field holding a
/// `.pdf`. Missing or non-PDF uploads get a 400; extraction failures a 500.
async fn handle_extract_outline(mut multipart: Multipart) -> ApiResponse {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read upload: {e}"),
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("malformed multipart request: {e}"),
                );
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "no file part in the request".to_string(),
        );
    };

    if !is_pdf_filename(&filename) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "no selected file or file is not a PDF".to_string(),
        );
    }

    log::info!("extracting outline from {filename} ({} bytes)", bytes.len());

    match outline::extract_outline(&bytes) {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("an error occurred during processing: {e}"),
            ),
        },
        Err(e) => {
            log::error!("extraction failed for {filename}: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("an error occurred during processing: {e}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_filename_check() {
        assert!(is_pdf_filename("report.pdf"));
        assert!(is_pdf_filename("REPORT.PDF"));
        assert!(!is_pdf_filename(""));
        assert!(!is_pdf_filename("report.docx"));
        assert!(!is_pdf_filename("pdf"));
    }
}
