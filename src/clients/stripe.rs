use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BillingConfig;

/// Raised through `anyhow` when no secret key is set.
#[derive(Debug, Error)]
#[error("Billing provider secret key is not configured")]
pub struct BillingNotConfigured;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Monthly,
    Annual,
}

impl PlanInterval {
    /// Recurring interval as the billing provider names it.
    #[must_use]
    pub const fn provider_interval(&self) -> &'static str {
        match self {
            Self::Monthly => "month",
            Self::Annual => "year",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Annual => "Annual",
        }
    }
}

#[derive(Debug)]
pub struct CreateCustomerParams<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub agent_id: i32,
}

#[derive(Debug)]
pub struct CheckoutParams<'a> {
    pub customer_id: &'a str,
    pub agent_id: i32,
    pub plan: PlanInterval,
    pub unit_amount_cents: i64,
    pub currency: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Returns the new customer's id.
    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<String>;

    async fn create_checkout_session(&self, params: CheckoutParams<'_>)
    -> Result<CheckoutSession>;

    /// Returns the portal URL.
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String>;

    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<()>;
}

/// Stripe REST client (form-encoded requests, bearer secret key).
pub struct StripeClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UrlOnly {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn post_form<T>(&self, path: &str, form: &[(String, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        if self.secret_key.is_empty() {
            bail!(BillingNotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to reach billing provider ({path})"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), path, "Billing provider rejected request");
            bail!("Billing provider error ({status}): {message}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Invalid billing provider response ({path})"))
    }
}

fn field(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<String> {
        let form = [
            field("email", params.email),
            field("name", params.name),
            field("metadata[agent_id]", params.agent_id),
        ];
        let customer: IdOnly = self.post_form("customers", &form).await?;
        debug!(customer_id = %customer.id, agent_id = params.agent_id, "Created billing customer");
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutParams<'_>,
    ) -> Result<CheckoutSession> {
        let product_name = format!("Insurance Content Pro - {}", params.plan.label());
        let form = [
            field("mode", "subscription"),
            field("customer", params.customer_id),
            field("client_reference_id", params.agent_id),
            field("line_items[0][quantity]", 1),
            field("line_items[0][price_data][currency]", params.currency),
            field("line_items[0][price_data][unit_amount]", params.unit_amount_cents),
            field(
                "line_items[0][price_data][recurring][interval]",
                params.plan.provider_interval(),
            ),
            field("line_items[0][price_data][product_data][name]", product_name),
            field("metadata[agent_id]", params.agent_id),
            field("subscription_data[metadata][agent_id]", params.agent_id),
            field("success_url", params.success_url),
            field("cancel_url", params.cancel_url),
        ];
        self.post_form("checkout/sessions", &form).await
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String> {
        let form = [
            field("customer", customer_id),
            field("return_url", return_url),
        ];
        let session: UrlOnly = self.post_form("billing_portal/sessions", &form).await?;
        Ok(session.url)
    }

    async fn set_cancel_at_period_end(&self, subscription_id: &str, cancel: bool) -> Result<()> {
        let form = [field("cancel_at_period_end", cancel)];
        let _: IdOnly = self
            .post_form(&format!("subscriptions/{subscription_id}"), &form)
            .await?;
        Ok(())
    }
}
