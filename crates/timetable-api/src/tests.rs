//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use timetable_core::placement::PlacementOptions;
use timetable_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store), PlacementOptions::default())
}

async fn send_with(
  app: &Router,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, &str)>,
  body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = match body {
    Some(b) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(b.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, headers, value)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let (status, _, value) = send_with(app, method, uri, vec![], body).await;
  (status, value)
}

fn config_body(periods: u32) -> Value {
  json!({
    "name": "Main",
    "periods_per_day": periods,
    "school_start_time": "08:00",
    "school_end_time": "15:00",
    "period_duration": 40,
    "break_periods": [
      { "name": "Recess", "start_time": "10:00", "end_time": "10:20", "period_after": 2 }
    ],
    "days_of_week": ["Monday", "Tuesday"]
  })
}

async fn create_timetable(app: &Router, config_id: Option<&str>) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/timetables",
    Some(json!({
      "name": "Year 7",
      "term": "Autumn",
      "academic_year": "2025/26",
      "config_id": config_id,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["timetable_id"].as_str().unwrap().to_string()
}

fn entry_body(period: &str, teacher: Uuid, class: Uuid) -> Value {
  json!({ "day": "Monday", "period": period, "teacher_id": teacher, "class_id": class })
}

// ── Configs ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn saved_config_becomes_active_and_previews_its_grid() {
  let app = app().await;

  let (status, config) = send(&app, "POST", "/configs", Some(config_body(5))).await;
  assert_eq!(status, StatusCode::CREATED, "{config}");
  assert_eq!(config["is_active"], true);
  let id = config["config_id"].as_str().unwrap();

  let (status, active) = send(&app, "GET", "/configs/active", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(active["config_id"], id);

  let (status, grid) = send(&app, "GET", &format!("/configs/{id}/grid"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(grid["days"], json!(["Monday", "Tuesday"]));
  let cells = grid["cells"].as_array().unwrap();
  assert_eq!(cells.len(), 6);
  assert_eq!(cells[2]["kind"], "break");
  assert_eq!(cells[2]["start"], "10:00");
  assert_eq!(cells[3]["start"], "10:20");
}

#[tokio::test]
async fn invalid_config_is_a_bad_request() {
  let app = app().await;
  let (status, body) = send(&app, "POST", "/configs", Some(config_body(0))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("periods"));

  let (status, _) = send(&app, "GET", "/configs/active", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_config_keeps_the_timetable() {
  let app = app().await;
  let (_, config) = send(&app, "POST", "/configs", Some(config_body(5))).await;
  let config_id = config["config_id"].as_str().unwrap();
  let tt = create_timetable(&app, Some(config_id)).await;

  let (status, _) = send(&app, "DELETE", &format!("/configs/{config_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = send(&app, "GET", &format!("/timetables/{tt}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["config_id"], Value::Null);
}

// ── Timetables ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_ids_are_not_found() {
  let app = app().await;
  let id = Uuid::new_v4();
  for uri in [
    format!("/timetables/{id}"),
    format!("/timetables/{id}/entries"),
    format!("/entries/{id}"),
    format!("/versions/{id}/changes"),
    format!("/configs/{id}"),
  ] {
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    assert!(body["error"].is_string());
  }
}

#[tokio::test]
async fn reversed_term_dates_are_rejected() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/timetables",
    Some(json!({
      "name": "Year 7",
      "term": "Autumn",
      "academic_year": "2025/26",
      "start_date": "2025-12-01",
      "end_date": "2025-09-01",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Entries ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn double_booking_is_409_unless_forced() {
  let app = app().await;
  let tt = create_timetable(&app, None).await;
  let uri = format!("/timetables/{tt}/entries");
  let t1 = Uuid::new_v4();

  let (status, first) =
    send(&app, "POST", &uri, Some(entry_body("3", t1, Uuid::new_v4()))).await;
  assert_eq!(status, StatusCode::CREATED, "{first}");
  assert_eq!(first["period"], "3");

  let clash = entry_body("3", t1, Uuid::new_v4());
  let (status, body) = send(&app, "POST", &uri, Some(clash.clone())).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(
    body["conflicts"],
    json!([{
      "day": "Monday",
      "period": "3",
      "type": "teacher",
      "entity_id": t1,
      "message": body["conflicts"][0]["message"],
    }])
  );

  let mut forced = clash;
  forced["force"] = json!(true);
  let (status, _) = send(&app, "POST", &uri, Some(forced)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, conflicts) = send(&app, "GET", &format!("/timetables/{tt}/conflicts"), None).await;
  assert_eq!(conflicts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn entry_listing_supports_conditional_requests() {
  let app = app().await;
  let tt = create_timetable(&app, None).await;
  let uri = format!("/timetables/{tt}/entries");
  send(&app, "POST", &uri, Some(entry_body("1", Uuid::new_v4(), Uuid::new_v4()))).await;

  let (status, headers, body) = send_with(&app, "GET", &uri, vec![], None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();

  let (status, _, _) =
    send_with(&app, "GET", &uri, vec![(header::IF_NONE_MATCH, etag.as_str())], None).await;
  assert_eq!(status, StatusCode::NOT_MODIFIED);

  send(&app, "POST", &uri, Some(entry_body("2", Uuid::new_v4(), Uuid::new_v4()))).await;
  let (status, headers, _) =
    send_with(&app, "GET", &uri, vec![(header::IF_NONE_MATCH, etag.as_str())], None).await;
  assert_eq!(status, StatusCode::OK);
  assert_ne!(headers.get(header::ETAG).unwrap().to_str().unwrap(), etag);
}

#[tokio::test]
async fn locked_entries_cannot_be_deleted() {
  let app = app().await;
  let tt = create_timetable(&app, None).await;
  let (_, entry) = send(
    &app,
    "POST",
    &format!("/timetables/{tt}/entries"),
    Some(entry_body("1", Uuid::new_v4(), Uuid::new_v4())),
  )
  .await;
  let id = entry["entry_id"].as_str().unwrap();
  let actor = Uuid::new_v4();

  let (status, locked) = send(
    &app,
    "PUT",
    &format!("/entries/{id}/lock"),
    Some(json!({ "locked": true, "changed_by": actor })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(locked["is_locked"], true);
  assert_eq!(locked["degraded"], json!([]));

  let (status, _) = send(&app, "DELETE", &format!("/entries/{id}"), None).await;
  assert_eq!(status, StatusCode::LOCKED);

  send(&app, "PUT", &format!("/entries/{id}/lock"), Some(json!({ "locked": false }))).await;
  let (status, removed) =
    send(&app, "DELETE", &format!("/entries/{id}?changed_by={actor}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(removed["entry_id"], id);
}

#[tokio::test]
async fn manual_changes_show_up_in_the_change_log() {
  let app = app().await;
  let tt = create_timetable(&app, None).await;
  let actor = Uuid::new_v4();
  let mut body = entry_body("1", Uuid::new_v4(), Uuid::new_v4());
  body["changed_by"] = json!(actor);
  body["reason"] = json!("cover lesson");

  let (status, entry) =
    send(&app, "POST", &format!("/timetables/{tt}/entries"), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(entry["degraded"], json!([]));

  let (_, versions) = send(&app, "GET", &format!("/timetables/{tt}/versions"), None).await;
  let version_id = versions[0]["version_id"].as_str().unwrap();
  let (status, changes) =
    send(&app, "GET", &format!("/versions/{version_id}/changes"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(changes[0]["action"], "create");
  assert_eq!(changes[0]["reason"], "cover lesson");
  assert_eq!(changes[0]["entry_id"], entry["entry_id"]);
}

// ── Generation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_returns_a_report_with_a_version() {
  let app = app().await;
  send(&app, "POST", "/configs", Some(config_body(5))).await;
  let tt = create_timetable(&app, None).await;
  let (teacher, class, subject) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let (status, report) = send(
    &app,
    "POST",
    &format!("/timetables/{tt}/generate"),
    Some(json!({
      "assignments": [
        { "teacher_id": teacher, "class_id": class, "subject_id": subject, "periods": 2 },
        { "teacher_id": teacher }
      ],
      "description": "first draft"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{report}");
  assert_eq!(report["entries"].as_array().unwrap().len(), 2);
  assert_eq!(report["conflicts"], json!([]));
  assert_eq!(report["unplaced"], json!([]));
  assert_eq!(report["dropped"].as_array().unwrap().len(), 1);
  assert_eq!(report["version"]["version_number"], 1);
  assert_eq!(report["version"]["description"], "first draft");
  assert_eq!(report["degraded"], json!([]));

  let (_, versions) = send(&app, "GET", &format!("/timetables/{tt}/versions"), None).await;
  assert_eq!(versions.as_array().unwrap().len(), 1);

  let (status, version) = send(
    &app,
    "POST",
    &format!("/timetables/{tt}/versions"),
    Some(json!({ "description": "checkpoint" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(version["version_number"], 2);
  assert_eq!(version["checksum"], report["version"]["checksum"]);
}

#[tokio::test]
async fn generate_without_a_config_is_not_found() {
  let app = app().await;
  let tt = create_timetable(&app, None).await;
  let (status, body) = send(
    &app,
    "POST",
    &format!("/timetables/{tt}/generate"),
    Some(json!({ "assignments": [] })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("config"));
}
