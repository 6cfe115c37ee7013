//! reqwest 客户端的真实请求格式：用本地 axum 服务接收并检查

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use broker_intake::clients::{ProcessingClient, RecordsClient};
use broker_intake::infrastructure::{ProcessingEndpoint, RecordStore};
use broker_intake::models::{
    ApplicantPayload, Datasheet, DocumentCategory, UploadFile, UploadRequest,
};
use broker_intake::{AppError, Config};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct Captured {
    uploads: Mutex<Vec<Vec<CapturedPart>>>,
    auth_headers: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, Value)>>,
}

type Shared = Arc<Captured>;

async fn upload(State(state): State<Shared>, mut multipart: Multipart) -> Json<Value> {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    state.uploads.lock().await.push(parts);
    Json(json!({
        "message": "queued",
        "queueStatus": { "remainingInQueue": 4, "totalFiles": 2, "processing": true }
    }))
}

async fn list_records(
    State(state): State<Shared>,
    Path(datasheet): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.auth_headers.lock().await.push(auth);
    Json(json!({
        "success": true,
        "data": {
            "total": 1,
            "records": [
                { "recordId": format!("rec-{datasheet}"), "fields": { "First Name": "Jane", "Last Name": "Doe", "Applicant_ID": "A-1" } }
            ]
        }
    }))
}

async fn create_records(
    State(state): State<Shared>,
    Path(datasheet): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let fields = body["records"][0]["fields"].clone();
    state.posted.lock().await.push((datasheet, body));
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "code": 200,
            "data": { "records": [ {
                "recordId": "recNew",
                "fields": {
                    "Applicant_ID": "A-9",
                    "First Name": fields["First Name"],
                    "Last Name": fields["Last Name"]
                }
            } ] }
        })),
    )
}

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn start() -> (SocketAddr, Shared) {
    let state: Shared = Arc::new(Captured::default());
    let router = Router::new()
        .route("/upload", post(upload))
        .route(
            "/fusion/v1/datasheets/:datasheet/records",
            get(list_records).post(create_records),
        )
        .with_state(state.clone());
    (spawn_server(router).await, state)
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        records_api_base_url: format!("http://{addr}/fusion/v1/datasheets"),
        records_api_token: "test-token".to_string(),
        applicant_datasheet_id: "dstApplicants".to_string(),
        processing_endpoint_url: format!("http://{addr}"),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

fn request() -> UploadRequest {
    UploadRequest {
        applicant: ApplicantPayload {
            applicant_id: Some("A-9".to_string()),
            first_name: "John".to_string(),
            last_name: "Roe".to_string(),
            record_id: Some("recNew".to_string()),
            application_record_id: Some("recApp".to_string()),
        },
        files: vec![
            UploadFile {
                file_name: "id_card.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                category: DocumentCategory::NationalId,
                bytes: b"jpeg-bytes".to_vec(),
            },
            UploadFile {
                file_name: "bankstmt_march.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                category: DocumentCategory::BankStatement,
                bytes: b"%PDF-1.4".to_vec(),
            },
        ],
    }
}

#[tokio::test]
async fn multipart_upload_has_files_categories_and_applicant() {
    let (addr, state) = start().await;
    let client = ProcessingClient::new(&config_for(addr)).unwrap();

    let receipt = client.upload(&request()).await.unwrap();
    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.status_line(), "已排队 2 个文件，队列剩余 4 个");

    let uploads = state.uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    let parts = &uploads[0];

    let files: Vec<&CapturedPart> = parts.iter().filter(|p| p.name == "files").collect();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_name.as_deref(), Some("id_card.jpg"));
    assert_eq!(files[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(files[1].data, b"%PDF-1.4".to_vec());

    let category = |name: &str| {
        parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| String::from_utf8(p.data.clone()).unwrap())
    };
    assert_eq!(category("document_type_id_card.jpg").as_deref(), Some("national_id"));
    assert_eq!(
        category("document_type_bankstmt_march.pdf").as_deref(),
        Some("bank_statement")
    );

    let applicant: Value = serde_json::from_str(&category("applicant").unwrap()).unwrap();
    assert_eq!(
        applicant,
        json!({
            "Applicant_ID": "A-9",
            "First Name": "John",
            "Last Name": "Roe",
            "recordId": "recNew",
            "application_recordId": "recApp"
        })
    );
}

#[tokio::test]
async fn non_success_status_is_an_upload_error() {
    let router = Router::new().route(
        "/upload",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
    );
    let addr = spawn_server(router).await;
    let client = ProcessingClient::new(&config_for(addr)).unwrap();

    let err = client.upload(&request()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn accepted_status_counts_as_queued() {
    let router = Router::new().route(
        "/upload",
        post(|| async {
            (
                StatusCode::ACCEPTED,
                Json(json!({ "queueStatus": { "remainingInQueue": 1 } })),
            )
        }),
    );
    let addr = spawn_server(router).await;
    let client = ProcessingClient::new(&config_for(addr)).unwrap();

    let receipt = client.upload(&request()).await.unwrap();
    assert_eq!(receipt.status, 202);
    assert_eq!(receipt.status_line(), "队列剩余 1 个文件");
}

#[tokio::test]
async fn rejected_upload_is_not_worth_resending() {
    let router = Router::new().route(
        "/upload",
        post(|| async { (StatusCode::BAD_REQUEST, "Unsupported file type.") }),
    );
    let addr = spawn_server(router).await;
    let client = ProcessingClient::new(&config_for(addr)).unwrap();

    let err = client.upload(&request()).await.unwrap_err();
    assert!(err.to_string().contains("400"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn slow_endpoint_hits_the_configured_timeout() {
    let router = Router::new().route(
        "/upload",
        post(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            "late"
        }),
    );
    let addr = spawn_server(router).await;
    let config = Config {
        request_timeout_secs: 1,
        ..config_for(addr)
    };
    let client = ProcessingClient::new(&config).unwrap();

    let started = std::time::Instant::now();
    let err = client.upload(&request()).await.unwrap_err();
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn plain_text_success_is_accepted_without_queue_status() {
    let router = Router::new().route("/upload", post(|| async { "ok" }));
    let addr = spawn_server(router).await;
    let client = ProcessingClient::new(&config_for(addr)).unwrap();

    let receipt = client.upload(&request()).await.unwrap();
    assert!(receipt.queue_status.is_none());
    assert_eq!(receipt.status_line(), "已提交");
}

#[tokio::test]
async fn records_client_sends_bearer_token_and_parses_list() {
    let (addr, state) = start().await;
    let client = RecordsClient::new(&config_for(addr)).unwrap();

    let records = client.fetch_records(Datasheet::Applicants).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_id.as_deref(), Some("rec-dstApplicants"));
    assert!(records[0].has_name("Jane", "Doe"));
    assert_eq!(
        *state.auth_headers.lock().await,
        vec!["Bearer test-token".to_string()]
    );
}

#[tokio::test]
async fn records_client_posts_field_key_body() {
    let (addr, state) = start().await;
    let client = RecordsClient::new(&config_for(addr)).unwrap();
    let body = json!({
        "records": [{ "fields": { "First Name": "John", "Last Name": "Roe" } }],
        "fieldKey": "name"
    });

    let response = client
        .create_records(Datasheet::Applicants, body.clone())
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    let posted = state.posted.lock().await;
    assert_eq!(posted[0], ("dstApplicants".to_string(), body));
}

#[tokio::test]
async fn unreachable_records_store_is_a_transport_error() {
    // 绑定后立即释放端口，连接会被拒绝
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RecordsClient::new(&config_for(addr)).unwrap();
    let err = client.fetch_records(Datasheet::Applicants).await.unwrap_err();
    assert!(matches!(err, AppError::Api(_)));
    assert!(err.is_retryable());
}
