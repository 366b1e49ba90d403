#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use insurecontent::api::AppState;
use insurecontent::clients::{
    BillingProvider, CheckoutParams, CheckoutSession, Completion, CompletionRequest,
    ContentGenerator, CreateCustomerParams, GeneratedImage, GenerationError, ImageBytes,
    ImageRequest,
};
use insurecontent::config::Config;
use insurecontent::state::Providers;
use serde_json::{Value, json};
use tokio::sync::{Barrier, Mutex};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const PASSWORD: &str = "sunshine42";

/// Seven well-formed posts as a cooperative provider would answer.
#[must_use]
pub fn valid_week_json() -> String {
    let posts: Vec<Value> = (1..=7)
        .map(|day| {
            json!({
                "day": day,
                "post_text": format!("Day {day}: protect what matters most."),
                "image_description": format!("Family on day {day}"),
                "hashtags": ["#Insurance", "FinalExpense"],
                "insurance_focus": "final_expense",
                "content_theme": "protection",
                "engagement_hook": "Who depends on you?"
            })
        })
        .collect();
    Value::Array(posts).to_string()
}

/// In-process stand-in for the text and image provider.
pub struct FakeGenerator {
    pub completion: Mutex<String>,
    pub fail_completion: AtomicBool,
    pub completion_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    /// 1-based image call numbers that fail.
    pub failing_image_calls: Mutex<HashSet<usize>>,
    pub barrier: Option<Arc<Barrier>>,
}

impl FakeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completion: Mutex::new(valid_week_json()),
            fail_completion: AtomicBool::new(false),
            completion_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            failing_image_calls: Mutex::new(HashSet::new()),
            barrier: None,
        }
    }

    /// Holds every completion until `parties` callers are inside the provider.
    #[must_use]
    pub fn with_barrier(parties: usize) -> Self {
        Self {
            barrier: Some(Arc::new(Barrier::new(parties))),
            ..Self::new()
        }
    }

    pub async fn respond_with(&self, text: &str) {
        *self.completion.lock().await = text.to_string();
    }

    pub fn completions(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn images(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, GenerationError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(GenerationError::Api {
                status: 500,
                message: "provider exploded".to_string(),
            });
        }
        Ok(Completion {
            text: self.completion.lock().await.clone(),
            total_tokens: 1200,
        })
    }

    async fn generate_image(
        &self,
        _request: ImageRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let call = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_image_calls.lock().await.contains(&call) {
            return Err(GenerationError::InvalidResponse("no image returned".to_string()));
        }
        Ok(GeneratedImage {
            url: format!("https://images.test/{call}.png"),
        })
    }

    async fn download_image(&self, _url: &str) -> Result<ImageBytes, GenerationError> {
        Ok(ImageBytes {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        })
    }
}

/// Billing provider that records what it was asked to do.
#[derive(Default)]
pub struct FakeBilling {
    pub customers: AtomicUsize,
    pub cancel_flags: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<String> {
        self.customers.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cus_{}", params.agent_id))
    }

    async fn create_checkout_session(&self, params: CheckoutParams<'_>) -> Result<CheckoutSession> {
        Ok(CheckoutSession {
            id: format!("cs_{}", params.agent_id),
            url: format!("https://checkout.test/{}", params.customer_id),
        })
    }

    async fn create_portal_session(&self, customer_id: &str, _return_url: &str) -> Result<String> {
        Ok(format!("https://portal.test/{customer_id}"))
    }

    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<()> {
        self.cancel_flags
            .lock()
            .await
            .push((subscription_id.to_string(), cancel));
        Ok(())
    }
}

#[must_use]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.billing.webhook_secret = WEBHOOK_SECRET.to_string();
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub generator: Arc<FakeGenerator>,
    pub billing: Arc<FakeBilling>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FakeGenerator::new()).await
}

pub async fn spawn_app_with(generator: FakeGenerator) -> TestApp {
    let generator = Arc::new(generator);
    let billing = Arc::new(FakeBilling::default());
    let providers = Providers {
        generator: generator.clone(),
        billing: billing.clone(),
    };

    let state = insurecontent::api::create_app_state_with_providers(test_config(), providers)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: insurecontent::api::router(state.clone()),
        state,
        generator,
        billing,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, cookie, Body::empty())).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, cookie, Body::empty())).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, cookie, Body::from(body.to_string())))
            .await
    }

    /// Registers a fresh agent and returns its session cookie and id.
    pub async fn register(&self, email: &str) -> (String, i32) {
        let response = self
            .router
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/register",
                None,
                Body::from(
                    json!({
                        "email": email,
                        "password": PASSWORD,
                        "first_name": "Pat",
                        "last_name": "Agent"
                    })
                    .to_string(),
                ),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).expect("register should start a session");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let id = body["data"]["agent"]["id"].as_i64().unwrap();
        (cookie, i32::try_from(id).unwrap())
    }
}

#[must_use]
pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body).unwrap()
}

/// `name=value` part of the session cookie set on `response`.
#[must_use]
pub fn session_cookie<B>(response: &axum::http::Response<B>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}
