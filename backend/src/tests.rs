//! Integration tests for the JobSwipe backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::triage::SwipeThresholds;
use crate::{create_router, AppState};

const TEST_SETTLE: Duration = Duration::from_millis(20);

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            thresholds: SwipeThresholds::default(),
            settle_delay: TEST_SETTLE,
            requeue_failed: false,
        };

        let app = create_router(AppState::new(repo, search, config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn create_job(&self, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/jobs",
                json!({
                    "title": title,
                    "company": "Resumind Inc.",
                    "location": "Remote",
                    "description": "Build delightful UIs in React."
                }),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn open_session(&self) -> Value {
        let (status, body) = self.post("/api/sessions", json!({})).await;
        assert_eq!(status, 200, "{body}");
        body["data"].clone()
    }

    async fn wait_for_settle(&self) {
        tokio::time::sleep(TEST_SETTLE * 10).await;
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_required() {
    let fixture = TestFixture::new().await;
    let anonymous = Client::new();

    let resp = anonymous
        .get(fixture.url("/api/jobs"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = anonymous
        .get(fixture.url("/api/jobs"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = anonymous
        .get(fixture.url("/api/jobs"))
        .bearer_auth("test-api-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_auth_disabled_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let (status, body) = fixture.get("/api/jobs").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_job_crud() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/jobs",
            json!({
                "title": "Backend Developer",
                "company": "DataCloud",
                "location": "NYC, Hybrid",
                "description": "Design APIs, work with PostgreSQL.",
                "contactEmail": "jobs@datacloud.io",
                "skills": ["Rust", "SQL"]
            }),
        )
        .await;
    assert_eq!(status, 200);
    let job_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["skills"], json!(["Rust", "SQL"]));
    let revision_after_create = body["revisionId"].as_i64().unwrap();

    let (status, body) = fixture.get(&format!("/api/jobs/{}", job_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["company"], "DataCloud");

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/jobs/{}", job_id)))
        .json(&json!({ "title": "Senior Backend Developer", "location": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Senior Backend Developer");
    assert!(body["data"].get("location").is_none());
    assert!(body["revisionId"].as_i64().unwrap() > revision_after_create);

    let (status, _) = fixture.delete(&format!("/api/jobs/{}", job_id)).await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get(&format!("/api/jobs/{}", job_id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_job_validation() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/jobs",
            json!({ "title": "  ", "company": "GoMobile", "description": "Ship it." }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post(
            "/api/jobs",
            json!({
                "title": "Mobile Engineer",
                "company": "GoMobile",
                "description": "Ship it.",
                "contactEmail": "not-an-email"
            }),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_jobs_listed_newest_first() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post("/api/jobs/seed", json!({})).await;
    assert_eq!(status, 200);
    let seeded: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].clone())
        .collect();
    assert_eq!(seeded.len(), 4);

    let (_, body) = fixture.get("/api/jobs").await;
    let listed: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].clone())
        .collect();
    assert_eq!(listed, seeded);

    let (status, body) = fixture.delete("/api/jobs").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["deleted"], 4);

    let (_, body) = fixture.get("/api/jobs").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_swipe_three_jobs_until_caught_up() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/jobs/seed", json!({})).await;
    let (_, body) = fixture.get("/api/jobs").await;
    let first_three: Vec<String> = body["data"].as_array().unwrap()[..3]
        .iter()
        .map(|j| j["id"].as_str().unwrap().to_string())
        .collect();
    fixture
        .delete(&format!(
            "/api/jobs/{}",
            body["data"][3]["id"].as_str().unwrap()
        ))
        .await;

    let session = fixture.open_session().await;
    let session_id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["total"], 3);
    assert_eq!(session["phase"], "idle");
    assert_eq!(session["position"], "1 / 3");
    assert_eq!(session["stack"].as_array().unwrap().len(), 3);

    for expected in &first_three {
        let (status, body) = fixture
            .post(
                &format!("/api/sessions/{}/swipe", session_id),
                json!({ "dx": 200.0, "vx": 0.0 }),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["data"]["swipe"], "right");
        assert_eq!(body["data"]["recorded"], true);
        assert_eq!(body["data"]["decision"]["jobId"], expected.as_str());
        assert_eq!(body["data"]["session"]["status"], "Applied");
        fixture.wait_for_settle().await;
    }

    let (_, body) = fixture
        .get(&format!("/api/sessions/{}", session_id))
        .await;
    assert_eq!(body["data"]["cursor"], 3);
    assert_eq!(body["data"]["phase"], "exhausted");
    assert_eq!(body["data"]["message"], "You're all caught up!");

    let (status, body) = fixture
        .post(
            &format!("/api/sessions/{}/swipe", session_id),
            json!({ "dx": 200.0 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (_, body) = fixture.get("/api/applied").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_drag_and_release() {
    let fixture = TestFixture::new().await;
    fixture.create_job("Frontend Engineer").await;
    let job_id = fixture.create_job("Platform Engineer").await;

    let session = fixture.open_session().await;
    let session_id = session["id"].as_str().unwrap().to_string();
    let base = format!("/api/sessions/{}", session_id);

    // Release without a drag is refused.
    let (status, _) = fixture
        .post(&format!("{}/release", base), json!({ "dx": 0.0 }))
        .await;
    assert_eq!(status, 409);

    // Small drag springs back.
    let (_, body) = fixture.post(&format!("{}/drag", base), json!({})).await;
    assert_eq!(body["data"]["phase"], "dragging");
    let (_, body) = fixture
        .post(
            &format!("{}/release", base),
            json!({ "dx": 60.0, "vx": 120.0 }),
        )
        .await;
    assert_eq!(body["data"]["swipe"], "none");
    assert!(body["data"].get("recorded").is_none());
    assert_eq!(body["data"]["session"]["cursor"], 0);

    // Fast flick left with a small offset rejects.
    fixture.post(&format!("{}/drag", base), json!({})).await;
    let (_, body) = fixture
        .post(
            &format!("{}/release", base),
            json!({ "dx": -30.0, "vx": -900.0 }),
        )
        .await;
    assert_eq!(body["data"]["swipe"], "left");
    assert_eq!(body["data"]["session"]["status"], "Rejected");
    assert_eq!(body["data"]["decision"]["jobId"], job_id.as_str());
    assert_eq!(body["data"]["decision"]["applied"], false);

    fixture.wait_for_settle().await;
    let (_, body) = fixture.get(&base).await;
    assert_eq!(body["data"]["cursor"], 1);
    assert_eq!(body["data"]["phase"], "idle");

    let (_, body) = fixture
        .get(&format!("/api/decisions?jobId={}", job_id))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = fixture.get("/api/applied").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_follows_job_changes() {
    let fixture = TestFixture::new().await;
    fixture.create_job("Data Engineer").await;

    let session = fixture.open_session().await;
    let session_id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["total"], 1);

    let new_id = fixture.create_job("Mobile Engineer").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (_, body) = fixture
        .get(&format!("/api/sessions/{}", session_id))
        .await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["stack"][1]["job"]["id"], new_id.as_str());

    fixture.delete(&format!("/api/jobs/{}", new_id)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (_, body) = fixture
        .get(&format!("/api/sessions/{}", session_id))
        .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_reseed_and_close_session() {
    let fixture = TestFixture::new().await;

    let session = fixture.open_session().await;
    let session_id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["phase"], "exhausted");
    assert_eq!(session["message"], "No jobs available.");

    // Create jobs after the session opened, then reseed explicitly.
    fixture.create_job("Frontend Engineer").await;
    fixture.create_job("Backend Developer").await;

    let (status, body) = fixture
        .post(&format!("/api/sessions/{}/reseed", session_id), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["cursor"], 0);
    assert_eq!(body["data"]["phase"], "idle");

    let (status, _) = fixture
        .delete(&format!("/api/sessions/{}", session_id))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .get(&format!("/api/sessions/{}", session_id))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_record_decision_directly() {
    let fixture = TestFixture::new().await;
    let job_id = fixture.create_job("Platform Engineer").await;

    for applied in [true, true] {
        let (status, body) = fixture
            .post(
                "/api/decisions",
                json!({ "jobId": job_id, "applied": applied }),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["applied"], applied);
    }

    // Duplicate decisions are kept, the applied view is distinct.
    let (_, body) = fixture.get("/api/decisions").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = fixture.get("/api/applied").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = fixture
        .post("/api/decisions", json!({ "jobId": "", "applied": true }))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_search_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/jobs/seed", json!({})).await;

    let (status, body) = fixture.get("/api/search?q=kubernetes").await;
    assert_eq!(status, 200);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["job"]["company"], "Nimbus Cloud");

    let (_, body) = fixture.get("/api/search?q=engineer&limit=2").await;
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);

    let (_, body) = fixture.get("/api/search?q=").await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/api/revision").await;
    let start = body["data"]["revisionId"].as_i64().unwrap();

    let job_id = fixture.create_job("Data Engineer").await;
    fixture
        .post(
            "/api/decisions",
            json!({ "jobId": job_id, "applied": false }),
        )
        .await;

    let (_, body) = fixture.get("/api/revision").await;
    assert_eq!(body["data"]["revisionId"].as_i64().unwrap(), start + 2);
    assert_eq!(body["revisionId"].as_i64().unwrap(), start + 2);
}
