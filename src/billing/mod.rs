//! Billing provider webhooks: signature verification and event decoding.

pub mod webhook;

pub use webhook::{BillingEvent, BillingEventKind, WebhookError, parse_event, verify_signature};
