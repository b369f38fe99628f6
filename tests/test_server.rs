//! Integration test: Server API endpoints

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use common::{koi_table, to_csv_bytes, unlabeled_koi_table};
use exoseeker::server::{create_router, AppState, ServerConfig};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "exoseeker-test-boundary";

fn test_app(dir: &TempDir) -> axum::Router {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_path: dir.path().join("model.json"),
        max_upload_size: 10 * 1024 * 1024,
    };
    let state = Arc::new(AppState::new(config.clone()));
    create_router(state, &config)
}

fn multipart_body(csv: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"koi.csv\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(csv);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(uri: &str, csv: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(csv, fields)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const QUICK_FIELDS: [(&str, &str); 7] = [
    ("estimators", "gb,mlp"),
    ("rf_n_estimators", "20"),
    ("rf_max_depth", "2"),
    ("gb_n_estimators", "15"),
    ("gb_max_depth", "2"),
    ("mlp_max_iter", "40"),
    ("seed", "7"),
];

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let response = test_app(&dir).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_trained"], false);
}

#[tokio::test]
async fn test_root_serves_html() {
    let dir = TempDir::new().unwrap();
    let response = test_app(&dir).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = TempDir::new().unwrap();
    let response = test_app(&dir).oneshot(get("/api/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_evaluation_before_training() {
    let dir = TempDir::new().unwrap();
    let response = test_app(&dir).oneshot(get("/api/evaluation")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_predict_without_model() {
    let dir = TempDir::new().unwrap();
    let csv = to_csv_bytes(&unlabeled_koi_table(5, 1));
    let response = test_app(&dir)
        .oneshot(upload("/api/predict", &csv, &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_train_evaluate_predict() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let csv = to_csv_bytes(&koi_table(100, 9));
    let response = app
        .clone()
        .oneshot(upload("/api/train", &csv, &QUICK_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let trained = json_body(response).await;
    assert_eq!(trained["n_test"], 24);
    assert!(trained["report"]["metrics"]["accuracy"].as_f64().unwrap() > 0.8);

    let response = app.clone().oneshot(get("/api/evaluation")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let evaluation = json_body(response).await;
    assert_eq!(evaluation["report"], trained["report"]);

    let batch = to_csv_bytes(&unlabeled_koi_table(10, 3));
    let response = app
        .clone()
        .oneshot(upload("/api/predict", &batch, &[("scaling", "training")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"predictions.csv\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "koi_disposition");

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(json_body(response).await["model_trained"], true);
}

#[tokio::test]
async fn test_train_missing_columns() {
    let dir = TempDir::new().unwrap();
    let df = koi_table(40, 1).drop("kepid").unwrap();
    let response = test_app(&dir)
        .oneshot(upload("/api/train", &to_csv_bytes(&df), &QUICK_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("kepid"));
}

#[tokio::test]
async fn test_train_unknown_estimator() {
    let dir = TempDir::new().unwrap();
    let csv = to_csv_bytes(&koi_table(40, 1));
    let response = test_app(&dir)
        .oneshot(upload("/api/train", &csv, &[("estimators", "svm")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_train_without_file() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"seed\"\r\n\r\n1\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/train")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = test_app(&dir).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_method() {
    let dir = TempDir::new().unwrap();
    let response = test_app(&dir).oneshot(get("/api/train")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
