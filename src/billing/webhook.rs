//! Signed webhook deliveries from the billing provider.
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`
//! where each `v1` is HMAC-SHA256 over `"{t}.{raw body}"` keyed with the
//! endpoint secret. Nothing is decoded until the signature checks out.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::domain::entitlement::{BillingTransition, ProviderState};

pub type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    NotConfigured,

    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedSignature,

    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("Signature does not match payload")]
    SignatureMismatch,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Hex HMAC for `payload` signed at `timestamp`.
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, WebhookError> {
    let mac = mac_for(payload, timestamp, secret)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Full header value as the provider sends it.
pub fn signature_header(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, WebhookError> {
    let signature = compute_signature(payload, timestamp, secret)?;
    Ok(format!("t={timestamp},v1={signature}"))
}

fn mac_for(payload: &[u8], timestamp: i64, secret: &str) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::NotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
    tolerance_seconds: i64,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(WebhookError::MissingSignature)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                );
            }
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if now.abs_diff(timestamp) > tolerance_seconds.unsigned_abs() {
        return Err(WebhookError::StaleTimestamp);
    }

    let mac = mac_for(payload, timestamp, secret)?;
    if signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok())
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutCompleted,
    SubscriptionUpdated {
        status: String,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    },
    SubscriptionDeleted,
    PaymentSucceeded {
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },
    PaymentFailed,
    Other,
}

impl BillingEventKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted => "checkout_completed",
            Self::SubscriptionUpdated { .. } => "subscription_updated",
            Self::SubscriptionDeleted => "subscription_deleted",
            Self::PaymentSucceeded { .. } => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::Other => "other",
        }
    }
}

/// A verified, decoded webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub id: String,
    pub event_type: String,
    pub created: DateTime<Utc>,
    pub agent_id: Option<i32>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub kind: BillingEventKind,
}

impl BillingEvent {
    /// Entitlement transition this event requests, if any.
    #[must_use]
    pub fn to_transition(&self) -> Option<BillingTransition> {
        match &self.kind {
            BillingEventKind::PaymentSucceeded {
                period_start,
                period_end,
            } => Some(BillingTransition::PaymentSucceeded {
                period_start: period_start.unwrap_or(self.created),
                period_end: *period_end,
            }),
            BillingEventKind::SubscriptionUpdated {
                status,
                period_start,
                period_end,
                cancel_at_period_end,
            } => Some(BillingTransition::SubscriptionUpdated {
                state: ProviderState::from_provider(status),
                period_start: *period_start,
                period_end: *period_end,
                cancel_at_period_end: *cancel_at_period_end,
            }),
            BillingEventKind::SubscriptionDeleted => {
                Some(BillingTransition::SubscriptionDeleted { at: self.created })
            }
            BillingEventKind::PaymentFailed => Some(BillingTransition::PaymentFailed),
            BillingEventKind::CheckoutCompleted | BillingEventKind::Other => None,
        }
    }
}

/// Decodes a verified payload.
pub fn parse_event(payload: &[u8]) -> Result<BillingEvent, WebhookError> {
    let root: Value = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    let id = root
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WebhookError::InvalidPayload("missing event id".into()))?
        .to_string();
    let event_type = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::InvalidPayload("missing event type".into()))?
        .to_string();
    let created = root
        .get("created")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    let object = root
        .pointer("/data/object")
        .ok_or_else(|| WebhookError::InvalidPayload("missing data.object".into()))?;

    let short_type = event_type
        .strip_prefix("customer.")
        .unwrap_or(&event_type);

    let kind = match short_type {
        "checkout.session.completed" => BillingEventKind::CheckoutCompleted,
        "subscription.updated" | "subscription.created" => BillingEventKind::SubscriptionUpdated {
            status: object
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            period_start: subscription_period(object, "current_period_start"),
            period_end: subscription_period(object, "current_period_end"),
            cancel_at_period_end: object
                .get("cancel_at_period_end")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        "subscription.deleted" => BillingEventKind::SubscriptionDeleted,
        "invoice.payment_succeeded" | "invoice.paid" => BillingEventKind::PaymentSucceeded {
            period_start: timestamp_at(object, "/lines/data/0/period/start")
                .or_else(|| timestamp_at(object, "/period_start")),
            period_end: timestamp_at(object, "/lines/data/0/period/end")
                .or_else(|| timestamp_at(object, "/period_end")),
        },
        "invoice.payment_failed" => BillingEventKind::PaymentFailed,
        _ => BillingEventKind::Other,
    };

    let is_subscription_object = matches!(
        kind,
        BillingEventKind::SubscriptionUpdated { .. } | BillingEventKind::SubscriptionDeleted
    );
    let subscription_id = if is_subscription_object {
        string_at(object, "/id")
    } else {
        string_at(object, "/subscription")
    };

    Ok(BillingEvent {
        id,
        event_type,
        created,
        agent_id: agent_id_from(object),
        customer_id: string_at(object, "/customer"),
        subscription_id,
        kind,
    })
}

fn agent_id_from(object: &Value) -> Option<i32> {
    [
        "/metadata/agent_id",
        "/subscription_details/metadata/agent_id",
        "/lines/data/0/metadata/agent_id",
        "/client_reference_id",
    ]
    .iter()
    .find_map(|pointer| match object.pointer(pointer)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        _ => None,
    })
}

fn string_at(object: &Value, pointer: &str) -> Option<String> {
    object
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp_at(object: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    object
        .pointer(pointer)
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Newer API versions moved the billing period onto the subscription items.
fn subscription_period(object: &Value, key: &str) -> Option<DateTime<Utc>> {
    timestamp_at(object, &format!("/{key}"))
        .or_else(|| timestamp_at(object, &format!("/items/data/0/{key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_727_000_000;

    fn invoice_paid(agent_id: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "invoice.payment_succeeded",
            "created": NOW,
            "data": {"object": {
                "customer": "cus_1",
                "subscription": "sub_1",
                "subscription_details": {"metadata": {"agent_id": agent_id}},
                "lines": {"data": [{"period": {"start": NOW, "end": NOW + 2_592_000}}]}
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = invoice_paid("7");
        let header = signature_header(&payload, NOW, SECRET).unwrap();
        assert_eq!(
            verify_signature(&payload, Some(&header), SECRET, NOW + 10, 300),
            Ok(())
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = invoice_paid("7");
        let header = signature_header(&payload, NOW, SECRET).unwrap();
        let tampered = invoice_paid("8");
        assert_eq!(
            verify_signature(&tampered, Some(&header), SECRET, NOW, 300),
            Err(WebhookError::SignatureMismatch)
        );
        assert_eq!(
            verify_signature(&payload, Some(&header), "other", NOW, 300),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn header_problems_are_reported() {
        let payload = invoice_paid("7");
        assert_eq!(
            verify_signature(&payload, None, SECRET, NOW, 300),
            Err(WebhookError::MissingSignature)
        );
        assert_eq!(
            verify_signature(&payload, Some("v1=abcd"), SECRET, NOW, 300),
            Err(WebhookError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&payload, Some("t=abc,v1=00"), SECRET, NOW, 300),
            Err(WebhookError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&payload, Some("t=1"), SECRET, NOW, 300),
            Err(WebhookError::MalformedSignature)
        );
        assert_eq!(
            verify_signature(&payload, Some("t=1,v1=00"), "", NOW, 300),
            Err(WebhookError::NotConfigured)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = invoice_paid("7");
        let header = signature_header(&payload, NOW - 1000, SECRET).unwrap();
        assert_eq!(
            verify_signature(&payload, Some(&header), SECRET, NOW, 300),
            Err(WebhookError::StaleTimestamp)
        );

        for extreme in [i64::MIN, i64::MAX] {
            let header = format!("t={extreme},v1=00ff");
            assert_eq!(
                verify_signature(&payload, Some(&header), SECRET, NOW, 300),
                Err(WebhookError::StaleTimestamp)
            );
        }
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let payload = invoice_paid("7");
        let good = compute_signature(&payload, NOW, SECRET).unwrap();
        let header = format!("t={NOW},v1={},v1={good}", "00".repeat(32));
        assert!(verify_signature(&payload, Some(&header), SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn invoice_event_decodes_to_payment_transition() {
        let event = parse_event(&invoice_paid("7")).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.agent_id, Some(7));
        assert_eq!(event.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(event.customer_id.as_deref(), Some("cus_1"));
        match event.to_transition() {
            Some(BillingTransition::PaymentSucceeded {
                period_start,
                period_end,
            }) => {
                assert_eq!(period_start.timestamp(), NOW);
                assert_eq!(period_end.map(|t| t.timestamp()), Some(NOW + 2_592_000));
            }
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[test]
    fn subscription_events_accept_both_naming_styles() {
        for event_type in ["customer.subscription.deleted", "subscription.deleted"] {
            let payload = serde_json::json!({
                "id": "evt_2",
                "type": event_type,
                "created": NOW,
                "data": {"object": {"id": "sub_9", "metadata": {"agent_id": 3}}}
            })
            .to_string();
            let event = parse_event(payload.as_bytes()).unwrap();
            assert_eq!(event.kind, BillingEventKind::SubscriptionDeleted);
            assert_eq!(event.agent_id, Some(3));
            assert_eq!(event.subscription_id.as_deref(), Some("sub_9"));
        }
    }

    #[test]
    fn subscription_update_reads_item_periods() {
        let payload = serde_json::json!({
            "id": "evt_3",
            "type": "customer.subscription.updated",
            "created": NOW,
            "data": {"object": {
                "id": "sub_9",
                "status": "past_due",
                "metadata": {"agent_id": "4"},
                "items": {"data": [{"current_period_start": NOW, "current_period_end": NOW + 60}]}
            }}
        })
        .to_string();
        let event = parse_event(payload.as_bytes()).unwrap();
        match event.to_transition() {
            Some(BillingTransition::SubscriptionUpdated {
                state, period_end, ..
            }) => {
                assert_eq!(state, ProviderState::Delinquent);
                assert_eq!(period_end.map(|t| t.timestamp()), Some(NOW + 60));
            }
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[test]
    fn unknown_events_and_bad_payloads() {
        let payload = br#"{"id":"evt_4","type":"charge.refunded","data":{"object":{}}}"#;
        let event = parse_event(payload).unwrap();
        assert_eq!(event.kind, BillingEventKind::Other);
        assert_eq!(event.agent_id, None);
        assert!(event.to_transition().is_none());

        assert!(matches!(
            parse_event(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_event(br#"{"type":"invoice.paid","data":{"object":{}}}"#),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
