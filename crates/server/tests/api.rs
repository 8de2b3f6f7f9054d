use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use tower::ServiceExt;
use uuid::Uuid;

use migration::MigratorTrait;

const ADMIN_COOKIE: &str = "cb-auth-token=admin-token";
const USER_COOKIE: &str = "cb-auth-token=user-token";

const ONE_PX_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Fresh in-memory ledger, two logged-in users (u1 is reimburse admin, u2 is
/// not), a scratch storage root pre-seeded with an invoice and a signature,
/// and a blank form template on disk.
async fn test_app() -> (Router, PathBuf) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();

    for (id, roles) in [
        ("u1", Some(r#"{"reimburse": ["admin"]}"#)),
        ("u2", None::<&str>),
    ] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO user_profiles (id, email, name, is_admin, roles, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            vec![
                id.into(),
                format!("{id}@lab.test").into(),
                "Alice".into(),
                false.into(),
                roles.into(),
                "2025-01-01T00:00:00+00:00".into(),
            ],
        ))
        .await
        .unwrap();
    }
    for (token, user) in [("admin-token", "u1"), ("user-token", "u2")] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO sessions (token, user_id, created_at, expires_at) \
             VALUES (?, ?, ?, ?)",
            vec![
                token.into(),
                user.into(),
                "2025-01-01T00:00:00+00:00".into(),
                "2099-01-01T00:00:00+00:00".into(),
            ],
        ))
        .await
        .unwrap();
    }

    let engine = engine::Engine::builder().database(db).build().await.unwrap();

    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/test_storage")
        .join(Uuid::new_v4().to_string());

    // Seed one invoice and one signature the advance pipeline can fetch.
    let invoice_dir = root.join("reimburse-invoices/u1");
    std::fs::create_dir_all(&invoice_dir).unwrap();
    std::fs::write(invoice_dir.join("invoice.pdf"), server::pdf::blank_template().unwrap())
        .unwrap();
    let signature_dir = root.join("reimburse-signatures/u1");
    std::fs::create_dir_all(&signature_dir).unwrap();
    std::fs::write(
        signature_dir.join("sig.png"),
        STANDARD.decode(ONE_PX_PNG).unwrap(),
    )
    .unwrap();

    let template_path = root.join("advance-template.pdf");
    std::fs::write(&template_path, server::pdf::blank_template().unwrap()).unwrap();

    let config = server::ServerConfig {
        storage_root: root.clone(),
        storage_secret: "test-secret".to_string(),
        template_path,
        auth: server::AuthConfig {
            token_url: "http://127.0.0.1:0/oauth/token".to_string(),
            client_id: "cashbook".to_string(),
            client_secret: "unused".to_string(),
            cookie_domain: Some("lab.test".to_string()),
            session_ttl_hours: 168,
        },
    };

    (server::app(engine, config), root)
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn egress_payload() -> serde_json::Value {
    serde_json::json!({
        "applicantName": "Alice",
        "itemName": "Reagents",
        "itemAmountMinor": 30000,
        "itemComment": "cold room",
        "invoiceDate": "2025-01-06",
        "invoiceFiles": ["u1/invoice.pdf"],
    })
}

fn advance_payload() -> serde_json::Value {
    serde_json::json!({
        "applicant_name": "Alice",
        "item_name": "Reagents",
        "item_amount": 300.0,
        "item_comment": "cold room",
        "invoice_date": "2025-01-06",
        "invoice_path": "u1/invoice.pdf",
        "signature_path": "u1/sig.png",
    })
}

#[tokio::test]
async fn routes_require_a_session() {
    let (app, _root) = test_app().await;

    for (method, uri) in [
        ("GET", "/egress"),
        ("POST", "/egress"),
        ("GET", "/ingress"),
        ("GET", "/summary"),
        ("GET", "/files/signed?bucket=reimburse-signatures&path=u1/sig.png"),
    ] {
        let response = app
            .clone()
            .oneshot(request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn unknown_session_token_is_unauthorized() {
    let (app, _root) = test_app().await;
    let response = app
        .oneshot(request("GET", "/egress", Some("cb-auth-token=nope"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "please log in first");
}

#[tokio::test]
async fn egress_create_and_list_round_trip() {
    let (app, _root) = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/egress", Some(ADMIN_COOKIE), Some(egress_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());

    let response = app
        .oneshot(request("GET", "/egress", Some(ADMIN_COOKIE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rows = json_body(response).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["applicantName"], "Alice");
    assert_eq!(rows[0]["itemAmountMinor"], 30000);
    assert_eq!(rows[0]["status"], "pending");
    assert_eq!(rows[0]["userId"], "u1");
}

#[tokio::test]
async fn egress_write_denied_without_admin_role() {
    let (app, _root) = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/egress", Some(USER_COOKIE), Some(egress_payload())))
        .await
        .unwrap();
    // Ledger writes answer 200 with the failure inside the envelope.
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "no permission: reimburse admin role required");

    // But reads are open to any logged-in user.
    let response = app
        .oneshot(request("GET", "/egress", Some(USER_COOKIE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn egress_patch_updates_row() {
    let (app, _root) = test_app().await;

    app.clone()
        .oneshot(request("POST", "/egress", Some(ADMIN_COOKIE), Some(egress_payload())))
        .await
        .unwrap();
    let rows = json_body(
        app.clone()
            .oneshot(request("GET", "/egress", Some(ADMIN_COOKIE), None))
            .await
            .unwrap(),
    )
    .await;
    let id = rows[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/egress/{id}"),
            Some(ADMIN_COOKIE),
            Some(serde_json::json!({"status": "approved", "itemComment": null})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);

    let rows = json_body(
        app.oneshot(request("GET", "/egress", Some(ADMIN_COOKIE), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(rows[0]["status"], "approved");
    assert_eq!(rows[0]["itemComment"], serde_json::Value::Null);
    // Untouched fields survive the patch.
    assert_eq!(rows[0]["itemAmountMinor"], 30000);
}

#[tokio::test]
async fn summary_aggregates_both_ledgers() {
    let (app, _root) = test_app().await;

    app.clone()
        .oneshot(request("POST", "/egress", Some(ADMIN_COOKIE), Some(egress_payload())))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(
            "POST",
            "/ingress",
            Some(ADMIN_COOKIE),
            Some(serde_json::json!({
                "ingressDate": "2025-01-05",
                "ingressAmountMinor": 100000,
                "ingressComment": "grant",
            })),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(request("GET", "/summary", Some(USER_COOKIE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["totalIngressMinor"], 100000);
    assert_eq!(body["totalEgressMinor"], 30000);
    assert_eq!(body["balanceMinor"], 70000);

    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    // Descending by date: the claim (Jan 6) before the income (Jan 5).
    assert_eq!(transactions[0]["type"], "egress");
    assert_eq!(transactions[1]["type"], "ingress");

    let weekly = body["weekly"].as_array().unwrap();
    // Jan 5 2025 is a Sunday, Jan 6 a Monday: two different weeks.
    assert_eq!(weekly.len(), 2);
    assert_eq!(weekly[0]["week"], "2024-W53");
    assert_eq!(weekly[1]["week"], "2025-W02");
}

#[tokio::test]
async fn advance_generates_and_stores_the_pdf() {
    let (app, root) = test_app().await;

    let response = app
        .oneshot(request(
            "POST",
            "/reimburse/advance",
            Some(ADMIN_COOKIE),
            Some(advance_payload()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["path"], "u1/advance_Alice_20250106.pdf");

    let stored = root.join("reimburse-advances/u1/advance_Alice_20250106.pdf");
    let bytes = std::fs::read(stored).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn advance_rejects_missing_fields_before_any_io() {
    let (app, root) = test_app().await;

    let mut payload = advance_payload();
    payload["item_amount"] = serde_json::Value::Null;
    let response = app
        .oneshot(request("POST", "/reimburse/advance", Some(USER_COOKIE), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "missing required fields, please check and retry");

    assert!(!root.join("reimburse-advances").exists());
}

#[tokio::test]
async fn advance_rejects_non_numeric_amount() {
    let (app, root) = test_app().await;

    let mut payload = advance_payload();
    payload["item_amount"] = serde_json::json!("abc");
    let response = app
        .oneshot(request("POST", "/reimburse/advance", Some(USER_COOKIE), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "missing required fields, please check and retry");

    assert!(!root.join("reimburse-advances").exists());
}

#[tokio::test]
async fn advance_checks_fields_before_the_session() {
    let (app, _root) = test_app().await;

    // Without a session a complete payload still needs a login...
    let response = app
        .clone()
        .oneshot(request("POST", "/reimburse/advance", None, Some(advance_payload())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "please log in first");

    // ...but a broken payload is reported first.
    let mut payload = advance_payload();
    payload["item_amount"] = serde_json::Value::Null;
    let response = app
        .oneshot(request("POST", "/reimburse/advance", None, Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advance_reports_missing_invoice() {
    let (app, root) = test_app().await;

    let mut payload = advance_payload();
    payload["invoice_path"] = serde_json::json!("u1/missing.pdf");
    let response = app
        .oneshot(request("POST", "/reimburse/advance", Some(ADMIN_COOKIE), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "failed to fetch the invoice file");

    assert!(!root.join("reimburse-advances").exists());
}

#[tokio::test]
async fn upload_then_signed_fetch_round_trips() {
    let (app, _root) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/files/reimburse-signatures/u2/new-sig.png")
                .header(header::COOKIE, USER_COOKIE)
                .body(Body::from(STANDARD.decode(ONE_PX_PNG).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["path"], "u2/new-sig.png");

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/files/signed?bucket=reimburse-signatures&path=u2/new-sig.png",
            Some(USER_COOKIE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let url = json_body(response).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/files/raw/reimburse-signatures/u2/new-sig.png?"));

    // The raw fetch needs no cookie, only the signed query.
    let response = app
        .clone()
        .oneshot(request("GET", &url, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/png"
    );

    // Tampering with the path invalidates the token.
    let tampered = url.replace("new-sig.png", "other.png");
    let response = app.oneshot(request("GET", &tampered, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_url_for_missing_object_is_not_found() {
    let (app, _root) = test_app().await;
    let response = app
        .oneshot(request(
            "GET",
            "/files/signed?bucket=reimburse-signatures&path=u2/absent.png",
            Some(USER_COOKIE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callback_clears_corrupted_cookie_state() {
    let (app, _root) = test_app().await;

    let response = app
        .oneshot(request(
            "GET",
            "/auth/callback?code=abc",
            Some(r#"cb-auth-token={"access_token":"x"}"#),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/?error=corrupted_session");

    let cleared: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    // Bare and parent-domain removals for the token and its chunked names.
    assert_eq!(cleared.len(), 6);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    assert!(cleared.iter().any(|c| c.starts_with("cb-auth-token.0=")));
    assert!(cleared.iter().any(|c| c.contains("Domain=lab.test")));
}

#[tokio::test]
async fn callback_without_code_redirects_to_next() {
    let (app, _root) = test_app().await;
    let response = app
        .oneshot(request("GET", "/auth/callback?next=/ledger", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/ledger");
}

#[tokio::test]
async fn logout_closes_the_session() {
    let (app, _root) = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/auth/logout", Some(ADMIN_COOKIE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .oneshot(request("GET", "/egress", Some(ADMIN_COOKIE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
