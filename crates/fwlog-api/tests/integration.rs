//! Integration tests: upload, list with filters and paging, get by id.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fwlog_api::server::{self, AppState};
use fwlog_geo::CidrGeoLookup;
use fwlog_ingest::IngestionService;
use fwlog_store::{InMemoryLogStore, LogStore, SqliteLogStore};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::util::ServiceExt;

const BOUNDARY: &str = "fwlog-test-boundary";

const GEO_TABLE: &str = "network,country,city,latitude,longitude\n\
                         8.8.8.0/24,United States,Mountain View,37.386,-122.0838\n\
                         1.1.1.0/24,Australia,Sydney,-33.8688,151.2093\n";

const HEADER: &str = "Timestamp,Source IP,Destination IP,Source Port,Destination Port,Action\n";

fn app_with_store(store: Arc<dyn LogStore + Send + Sync>) -> axum::Router {
    let geo = CidrGeoLookup::from_csv_reader(GEO_TABLE.as_bytes()).unwrap();
    let state = Arc::new(AppState {
        ingestion: Arc::new(IngestionService::new(Arc::new(geo))),
        store,
        max_upload_bytes: 1024 * 1024,
    });
    server::router(state)
}

fn test_app() -> axum::Router {
    app_with_store(Arc::new(InMemoryLogStore::new()))
}

fn upload_request(field: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/logs/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    let j = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, j)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn upload(app: &axum::Router, content: &str) -> serde_json::Value {
    let (status, j) = send(app, upload_request("file", "export.csv", content)).await;
    assert_eq!(status, StatusCode::OK, "{j}");
    j
}

#[tokio::test]
async fn upload_then_list_and_get() {
    let app = test_app();
    let csv = format!(
        "{HEADER}\
         1746038962.8603900,8.8.8.8,1.1.1.1,51514,443,allow\n\
         1746125362,10.0.0.5,8.8.8.8,,,deny\n\
         1746211762,1.1.1.1,bogus,,,allow\n"
    );
    let j = upload(&app, &csv).await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["message"], "2 log entries processed and saved successfully.");
    assert_eq!(j["data"]["saved"], 2);
    assert_eq!(j["data"]["summary"]["rows_decoded"], 3);
    assert_eq!(j["data"]["summary"]["rejected_rows"][0]["line"], 4);

    let (status, j) = get(&app, "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    let page = &j["data"];
    assert_eq!(page["total_items"], 2);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["page_size"], 50);
    assert_eq!(page["total_pages"], 1);

    let items = page["items"].as_array().unwrap();
    assert_eq!(items[0]["action"], "deny");
    assert_eq!(items[0]["timestamp"], "2025-05-01T18:49:22.000Z");
    assert!(items[0]["source_geo_country"].is_null());
    assert_eq!(items[0]["destination_geo_city"], "Mountain View");

    let first = &items[1];
    assert_eq!(first["timestamp"], "2025-04-30T18:49:22.860Z");
    assert_eq!(first["source_port"], 51514);
    assert_eq!(first["destination_port"], 443);
    assert_eq!(first["source_geo_country"], "United States");
    assert_eq!(first["source_latitude"], 37.386);
    assert_eq!(first["destination_geo_city"], "Sydney");

    let id = first["id"].as_i64().unwrap();
    let (status, j) = get(&app, &format!("/api/logs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["data"], *first);
}

#[tokio::test]
async fn non_csv_extension_is_rejected() {
    let app = test_app();
    let csv = format!("{HEADER}1746038962,8.8.8.8,1.1.1.1,1,2,allow\n");
    let (status, j) = send(&app, upload_request("file", "export.txt", &csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(j["code"], 400);

    let (status, _) = send(&app, upload_request("file", "EXPORT.CSV", &csv)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_or_empty_file_part_is_rejected() {
    let app = test_app();
    let (status, _) = send(&app, upload_request("other", "export.csv", HEADER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, upload_request("file", "export.csv", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn header_only_file_saves_nothing() {
    let app = test_app();
    let j = upload(&app, HEADER).await;
    assert!(j["message"]
        .as_str()
        .unwrap()
        .starts_with("File processed, but no valid log entries found"));
    assert_eq!(j["data"]["saved"], 0);
    assert_eq!(j["data"]["summary"]["status"], "nothing_to_persist");

    let (_, j) = get(&app, "/api/logs").await;
    assert_eq!(j["data"]["total_items"], 0);
}

#[tokio::test]
async fn missing_column_fails_without_storing_anything() {
    let app = test_app();
    let csv = "Timestamp,Source IP,Action\n1746038962,8.8.8.8,allow\n";
    let (status, j) = send(&app, upload_request("file", "export.csv", csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(j["message"]
        .as_str()
        .unwrap()
        .contains("missing required columns"));

    let (_, j) = get(&app, "/api/logs").await;
    assert_eq!(j["data"]["total_items"], 0);
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let app = test_app();
    let (status, j) = get(&app, "/api/logs/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(j["code"], 404);
    assert!(j["data"].is_null());

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/api/logs/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

async fn seeded_app() -> axum::Router {
    let app = test_app();
    let csv = format!(
        "{HEADER}\
         1746038962,8.8.8.8,1.1.1.1,1000,443,ALLOW\n\
         1746125362,10.0.0.5,8.8.4.4,1001,53,deny\n\
         1746211762,1.1.1.1,8.8.8.8,1002,80,allow\n\
         1746298162,192.168.1.7,1.1.1.1,1003,22,drop\n\
         1746384562,8.8.8.8,10.0.0.9,1004,443,Allow\n"
    );
    upload(&app, &csv).await;
    app
}

fn actions(j: &serde_json::Value) -> Vec<String> {
    j["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["action"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn filters_narrow_the_listing() {
    let app = seeded_app().await;

    let (_, j) = get(&app, "/api/logs?action=allow").await;
    assert_eq!(j["data"]["total_items"], 3);
    assert_eq!(actions(&j), vec!["Allow", "allow", "ALLOW"]);

    let (_, j) = get(&app, "/api/logs?source_ip=8.8").await;
    assert_eq!(j["data"]["total_items"], 2);

    let (_, j) = get(&app, "/api/logs?destinationIpFilter=1.1.1.1&actionFilter=DROP").await;
    assert_eq!(actions(&j), vec!["drop"]);

    // 2025-05-01 through 2025-05-02, end day inclusive
    let (_, j) = get(&app, "/api/logs?start_date=2025-05-01&end_date=2025-05-02").await;
    assert_eq!(actions(&j), vec!["allow", "deny"]);

    let (_, j) = get(&app, "/api/logs?startDate=2025-05-03T00:00:00Z").await;
    assert_eq!(actions(&j), vec!["Allow", "drop"]);

    let (status, _) = get(&app, "/api/logs?start_date=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pagination_is_clamped_and_sliced() {
    let app = seeded_app().await;

    let (_, j) = get(&app, "/api/logs?page=2&page_size=2").await;
    assert_eq!(j["data"]["total_items"], 5);
    assert_eq!(j["data"]["total_pages"], 3);
    assert_eq!(j["data"]["current_page"], 2);
    assert_eq!(actions(&j), vec!["allow", "deny"]);

    let (_, j) = get(&app, "/api/logs?pageNumber=0&pageSize=0").await;
    assert_eq!(j["data"]["current_page"], 1);
    assert_eq!(j["data"]["page_size"], 10);

    let (_, j) = get(&app, "/api/logs?page_size=1000").await;
    assert_eq!(j["data"]["page_size"], 200);

    let (_, j) = get(&app, "/api/logs?page=7&page_size=2").await;
    assert!(j["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(j["data"]["total_items"], 5);
}

#[tokio::test]
async fn sqlite_backed_upload_then_filtered_list() {
    let app = app_with_store(Arc::new(SqliteLogStore::new(":memory:").unwrap()));
    let csv = format!(
        "{HEADER}\
         1746038962.8603900,8.8.8.8,1.1.1.1,51514,443,ALLOW\n\
         1746125362,10.0.0.5,8.8.8.8,,,deny\n\
         1746211762,1.1.1.1,8.8.8.8,1002,80,allow\n"
    );
    let j = upload(&app, &csv).await;
    assert_eq!(j["data"]["saved"], 3);

    let (status, j) = get(&app, "/api/logs?action=allow&page_size=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["data"]["total_items"], 2);
    assert_eq!(j["data"]["total_pages"], 2);
    let newest = &j["data"]["items"][0];
    assert_eq!(newest["timestamp"], "2025-05-02T18:49:22.000Z");
    assert_eq!(newest["source_geo_city"], "Sydney");

    let (_, j) = get(&app, "/api/logs?end_date=2025-04-30").await;
    let oldest = &j["data"]["items"][0];
    assert_eq!(j["data"]["total_items"], 1);
    assert_eq!(oldest["timestamp"], "2025-04-30T18:49:22.860Z");
    assert_eq!(oldest["source_port"], 51514);
    assert_eq!(oldest["destination_latitude"], -33.8688);

    let id = oldest["id"].as_i64().unwrap();
    let (status, j) = get(&app, &format!("/api/logs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(j["data"], *oldest);
}

#[tokio::test]
async fn health_says_ok() {
    let app = test_app();
    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}
