use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use metasoft_api::app::services::AppServices;
use metasoft_api::app::build_app_with_services;
use metasoft_api::middleware::{AuthState, SessionStore};
use metasoft_core::UserId;
use metasoft_infra::InMemoryStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the same router as prod, backed by an in-memory store, bound to
    /// an ephemeral port.
    async fn spawn(token: &str, user_id: UserId) -> Self {
        let sessions = SessionStore::new();
        sessions.issue(token, user_id);

        let services = Arc::new(AppServices::new(Arc::new(InMemoryStore::new())));
        let app = build_app_with_services(AuthState { sessions }, services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn company_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "street": "12 Canal St",
        "city": "Amsterdam",
        "postal_code": "1011",
        "country": "NL",
        "primary_color": "#2A9D8F",
        "default_template": "modern",
        "default_paper_size": "a4",
    })
}

async fn create_company(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    name: &str,
) -> String {
    let resp = client
        .post(format!("{}/companies", server.base_url))
        .bearer_auth(token)
        .json(&company_body(name))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public_and_domain_routes_require_a_session() {
    let server = TestServer::spawn("t-1", UserId::new()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/companies", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/companies", server.base_url))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invoice_workflow_end_to_end() {
    let token = "t-workflow";
    let server = TestServer::spawn(token, UserId::new()).await;
    let client = reqwest::Client::new();

    let issuer = create_company(&client, &server, token, "Issuer BV").await;
    let customer = create_company(&client, &server, token, "Customer BV").await;

    // Mark the issuer as default; new drafts should pre-fill from it.
    let resp = client
        .post(format!("{}/companies/{}/default", server.base_url, issuer))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/invoices/draft", server.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut draft: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(draft["from_company"].as_str().unwrap(), issuer);
    assert_eq!(draft["items"].as_array().unwrap().len(), 1);

    // Submitting the untouched draft fails with every violation reported.
    let resp = client
        .post(format!("{}/invoices", server.base_url))
        .bearer_auth(token)
        .json(&draft)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["fields"]["invoice_number"].is_array());
    assert!(body["fields"]["to_company"].is_array());

    // Fill it in and save.
    draft["invoice_number"] = json!("INV-2026-007");
    draft["invoice_date"] = json!("2026-08-15");
    draft["due_date"] = json!("2026-09-14");
    draft["to_company"] = json!(customer);
    draft["items"] = json!([
        { "description": "Design work", "quantity": "10", "unit_price": "85.00" },
        { "description": "Hosting", "quantity": "1", "unit_price": "25.50" },
    ]);

    let resp = client
        .post(format!("{}/invoices", server.base_url))
        .bearer_auth(token)
        .json(&draft)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let invoice: serde_json::Value = resp.json().await.unwrap();
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["total"], "875.50");

    // Duplicate invoice number for the same user is a conflict.
    let resp = client
        .post(format!("{}/invoices", server.base_url))
        .bearer_auth(token)
        .json(&draft)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Render the document with the issuer's defaults.
    let resp = client
        .get(format!("{}/invoices/{}/document", server.base_url, invoice_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let html = resp.text().await.unwrap();
    assert!(html.contains("INV-2026-007"));
    assert!(html.contains("Issuer BV"));
    assert!(html.contains("875.50"));

    // Unknown template selection is rejected, not defaulted.
    let resp = client
        .get(format!(
            "{}/invoices/{}/document?template=fancy",
            server.base_url, invoice_id
        ))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // draft → sent → paid; skipping backwards is a conflict.
    for status in ["sent", "paid"] {
        let resp = client
            .post(format!("{}/invoices/{}/status", server.base_url, invoice_id))
            .bearer_auth(token)
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = client
        .post(format!("{}/invoices/{}/status", server.base_url, invoice_id))
        .bearer_auth(token)
        .json(&json!({ "status": "draft" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn letterhead_options_and_generation() {
    let token = "t-letterhead";
    let server = TestServer::spawn(token, UserId::new()).await;
    let client = reqwest::Client::new();

    let company = create_company(&client, &server, token, "Acme & Sons").await;

    let resp = client
        .get(format!("{}/letterhead", server.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["companies"].as_array().unwrap().len(), 1);
    assert!(body["templates"].as_array().unwrap().contains(&json!("classic")));
    assert!(body["paper_sizes"].as_array().unwrap().contains(&json!("us_letter")));

    let resp = client
        .post(format!("{}/letterhead/generate", server.base_url))
        .bearer_auth(token)
        .json(&json!({
            "company_id": company,
            "body": "To whom it may concern,\nregards.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Acme &amp; Sons"));
    assert!(html.contains("To whom it may concern"));

    // Blank body is rejected.
    let resp = client
        .post(format!("{}/letterhead/generate", server.base_url))
        .bearer_auth(token)
        .json(&json!({ "company_id": company, "body": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_cannot_see_each_other() {
    let sessions = SessionStore::new();
    sessions.issue("alice", UserId::new());
    sessions.issue("bob", UserId::new());

    let services = Arc::new(AppServices::new(Arc::new(InMemoryStore::new())));
    let app = build_app_with_services(AuthState { sessions }, services);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base_url}/companies"))
        .bearer_auth("alice")
        .json(&company_body("Alice BV"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    let company_id = body["id"].as_str().unwrap();

    let resp = client
        .get(format!("{base_url}/companies/{company_id}"))
        .bearer_auth("bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .get(format!("{base_url}/companies"))
        .bearer_auth("bob")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());

    handle.abort();
}
