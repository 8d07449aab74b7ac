//! HTTP request handlers

use axum::body::Body;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use std::path::Path;

use super::server::AppContext;
use crate::audio::result::AnalysisResult;
use crate::audio::{analysis, decode};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn internal_error(message: impl Into<String>) -> ErrorReply {
    let error = message.into();
    log::warn!("Upload failed: {}", error);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error }))
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "beatscope audio analysis service",
    })
}

/// GET /upload
pub async fn upload_hint() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "POST an audio file as multipart field 'file'",
    })
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Answers every OPTIONS request with an empty 204, keeping any CORS headers.
pub async fn options_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let response = next.run(req).await;
    if !is_options {
        return response;
    }
    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    Response::from_parts(parts, Body::empty())
}

struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
}

/// Takes the field named `file`, else the first field that carried data.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, ErrorReply> {
    let mut first: Option<Upload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| internal_error(format!("Malformed multipart body: {}", e)))?
    {
        let is_file = field.name() == Some("file");
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| internal_error(format!("Failed to read upload: {}", e)))?;

        if is_file {
            return Ok(Some(Upload {
                bytes: bytes.to_vec(),
                file_name,
            }));
        }
        if first.is_none() && !bytes.is_empty() {
            first = Some(Upload {
                bytes: bytes.to_vec(),
                file_name,
            });
        }
    }
    Ok(first)
}

/// POST /upload - decode and analyse one clip
pub async fn upload(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ErrorReply> {
    let mut multipart = multipart.map_err(|e| internal_error(e.body_text()))?;
    let upload = read_upload(&mut multipart)
        .await?
        .ok_or_else(|| internal_error("No file in upload"))?;

    let name = upload.file_name.unwrap_or_else(|| "upload".to_string());
    let extension = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_owned);
    log::info!("Received {} ({} bytes)", name, upload.bytes.len());

    let config = ctx.analysis.clone();
    let jobs = ctx.jobs.clone();
    let bytes = upload.bytes;
    let job = async move {
        let permit = jobs
            .acquire_owned()
            .await
            .map_err(|e| internal_error(format!("Job queue closed: {}", e)))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let audio = decode::decode_bytes(bytes, extension.as_deref())?;
            analysis::analyze_decoded(audio, &config)
        })
        .await
        .map_err(|e| internal_error(format!("Analysis worker failed: {}", e)))
    };

    match tokio::time::timeout(ctx.request_timeout, job).await {
        Ok(Ok(Ok(result))) => {
            log::info!(
                "Analyzed {}: {:.2}s, {} frames, tempo={:.1}, beats={}",
                name,
                result.duration(),
                result.times().len(),
                result.tempo(),
                result.beat_count()
            );
            Ok(Json(result))
        }
        Ok(Ok(Err(e))) => Err(internal_error(e.to_string())),
        Ok(Err(reply)) => Err(reply),
        Err(_) => Err(internal_error(format!(
            "Analysis timed out after {}s",
            ctx.request_timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::server::{build_router, AppContext};
    use crate::audio::decode::tests::wav_bytes;
    use crate::config::{AnalysisConfig, ServerConfig};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "beatscopeboundary";

    fn app_with(server: ServerConfig) -> Router {
        let ctx = AppContext::new(AnalysisConfig::default(), &server);
        build_router(ctx, &server)
    }

    fn app() -> Router {
        app_with(ServerConfig::default())
    }

    fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, field, file_name
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn tone_wav(seconds: f32, sample_rate: u32) -> Vec<u8> {
        let len = (seconds * sample_rate as f32) as usize;
        let samples: Vec<f32> = (0..len)
            .map(|n| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * n as f32 / sample_rate as f32).sin())
            .collect();
        wav_bytes(&samples, 1, sample_rate)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_reports_service() {
        let (status, json) = send(app(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "beatscope audio analysis service");
    }

    #[tokio::test]
    async fn upload_get_explains_usage() {
        let (status, json) = send(app(), get("/upload")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "POST an audio file as multipart field 'file'");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (status, _) = send(app(), get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn options_anywhere_is_no_content() {
        for uri in ["/", "/upload", "/anything/else"] {
            let request = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(), request).await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{}", uri);
            assert_eq!(body, Value::Null);
        }
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_gets_cors_headers() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/upload")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn uploaded_wav_is_analysed() {
        let body = multipart_body("file", "tone.wav", &tone_wav(1.0, 22050));
        let (status, json) = send(app(), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK, "{}", json);
        assert!((json["duration"].as_f64().unwrap() - 1.0).abs() < 1e-9);
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 22050 / 512 + 1);
        assert_eq!(json["times"].as_array().unwrap().len(), data.len());
        assert_eq!(data[10]["chroma"].as_array().unwrap().len(), 12);
        assert_eq!(data[10]["mfcc"].as_array().unwrap().len(), 13);
    }

    #[tokio::test]
    async fn falls_back_to_first_field_with_data() {
        let body = multipart_body("audio", "clip.wav", &tone_wav(0.5, 16000));
        let (status, json) = send(app(), upload_request(body)).await;
        assert_eq!(status, StatusCode::OK, "{}", json);
        assert_eq!(json["data"].as_array().unwrap().len(), 8000 / 512 + 1);
    }

    #[tokio::test]
    async fn undecodable_upload_is_500_with_error() {
        let body = multipart_body("file", "notes.txt", b"definitely not audio");
        let (status, json) = send(app(), upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("Decode error"));
    }

    #[tokio::test]
    async fn non_multipart_post_is_500_with_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, json) = send(app(), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn empty_form_is_500_with_error() {
        let body = format!("--{}--\r\n", BOUNDARY).into_bytes();
        let (status, json) = send(app(), upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "No file in upload");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let server = ServerConfig {
            max_upload_bytes: 1024,
            ..Default::default()
        };
        let body = multipart_body("file", "tone.wav", &tone_wav(1.0, 22050));
        let (status, json) = send(app_with(server), upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn slow_analysis_times_out() {
        let server = ServerConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        let body = multipart_body("file", "tone.wav", &tone_wav(2.0, 44100));
        let (status, json) = send(app_with(server), upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("timed out"));
    }
}
