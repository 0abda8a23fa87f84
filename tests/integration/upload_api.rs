use super::{create_test_config, multipart_upload, pdf_with_text, ScriptedModel, TestApp};
use axum::http::StatusCode;
use knowledge_chat::Config;

// ============================================
// Upload API Tests
// ============================================

#[tokio::test]
async fn test_pdf_upload_is_chunked_and_stored() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let pdf = pdf_with_text("Quarterly revenue grew by twelve percent.");

    let res = app
        .send(multipart_upload("report.pdf", "application/pdf", &pdf, None))
        .await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["message"], "File uploaded and processed successfully");
    let data = &res.body["data"];
    assert_eq!(data["fileName"], "report.pdf");
    assert_eq!(data["pages"], 1);
    assert!(data["chunks"].as_u64().unwrap() > 0);
    assert_eq!(data["fileId"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn test_non_pdf_is_rejected() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let res = app
        .send(multipart_upload("notes.txt", "text/plain", b"plain text", None))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Only PDF files are allowed");
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let config = Config {
        require_auth: false,
        max_upload_bytes: 2048,
        ..create_test_config()
    };
    let app = TestApp::new(config, ScriptedModel::answering("unused"));

    let res = app
        .send(multipart_upload("big.pdf", "application/pdf", &vec![b'x'; 4096], None))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].as_str().unwrap().starts_with("File size cannot exceed"));
}

#[tokio::test]
async fn test_corrupt_pdf_is_a_bad_request() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let res = app
        .send(multipart_upload("broken.pdf", "application/pdf", b"%PDF-1.4 truncated", None))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let boundary = "xyz";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
    );
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(axum::body::Body::from(body))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_requires_auth_when_configured() {
    let app = TestApp::new(create_test_config(), ScriptedModel::answering("unused"));
    let pdf = pdf_with_text("secret");

    let res = app
        .send(multipart_upload("a.pdf", "application/pdf", &pdf, None))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
