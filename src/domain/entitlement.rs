//! Entitlement engine.
//!
//! Decides whether an agent may generate content and applies billing-driven
//! state transitions. Everything here is pure: callers pass the clock in and
//! persist whatever comes out. Status is authoritative; dates are never used
//! to infer a status on their own.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::SubscriptionStatus;

pub const TRIAL_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// Subscription bookkeeping carried on every agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionFields {
    pub status: SubscriptionStatus,
    pub trial_start: DateTime<Utc>,
    pub trial_end: DateTime<Utc>,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionFields {
    /// Fresh trial starting at `now`.
    #[must_use]
    pub fn new_trial(now: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Trial,
            trial_start: now,
            trial_end: now + Duration::days(TRIAL_DAYS),
            subscription_start: None,
            subscription_end: None,
            cancel_at_period_end: false,
        }
    }
}

/// Why generation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    TrialExpired,
    NoSubscription,
}

impl DenialReason {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TrialExpired => "trial_expired",
            Self::NoSubscription => "no_subscription",
        }
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::TrialExpired => {
                "Your free trial has expired. Please subscribe to continue generating content."
            }
            Self::NoSubscription => "An active subscription is required to generate content.",
        }
    }
}

#[must_use]
pub fn is_trial_active(fields: &SubscriptionFields, now: DateTime<Utc>) -> bool {
    fields.status == SubscriptionStatus::Trial && now <= fields.trial_end
}

#[must_use]
pub fn is_entitled(fields: &SubscriptionFields, now: DateTime<Utc>) -> bool {
    match fields.status {
        SubscriptionStatus::Active => true,
        SubscriptionStatus::Trial => is_trial_active(fields, now),
        SubscriptionStatus::Cancelled | SubscriptionStatus::Expired => false,
    }
}

/// Whole days left in the trial, rounded up. Zero outside a trial.
#[must_use]
pub fn days_remaining(fields: &SubscriptionFields, now: DateTime<Utc>) -> i64 {
    if fields.status != SubscriptionStatus::Trial {
        return 0;
    }
    let seconds = (fields.trial_end - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

#[must_use]
pub fn denial_reason(fields: &SubscriptionFields, now: DateTime<Utc>) -> Option<DenialReason> {
    if is_entitled(fields, now) {
        return None;
    }
    match fields.status {
        SubscriptionStatus::Trial => Some(DenialReason::TrialExpired),
        _ => Some(DenialReason::NoSubscription),
    }
}

/// Display-ready summary of an agent's entitlement at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementSnapshot {
    pub status: SubscriptionStatus,
    pub trial_days_remaining: i64,
    pub can_generate: bool,
    pub reason: Option<DenialReason>,
}

impl EntitlementSnapshot {
    #[must_use]
    pub fn evaluate(fields: &SubscriptionFields, now: DateTime<Utc>) -> Self {
        Self {
            status: fields.status,
            trial_days_remaining: days_remaining(fields, now),
            can_generate: is_entitled(fields, now),
            reason: denial_reason(fields, now),
        }
    }
}

/// Coarse view of the billing provider's own subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    /// `active` or `trialing`
    Live,
    Canceled,
    /// `past_due` or `unpaid`
    Delinquent,
    Other,
}

impl ProviderState {
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Live,
            "canceled" | "cancelled" => Self::Canceled,
            "past_due" | "unpaid" => Self::Delinquent,
            _ => Self::Other,
        }
    }
}

/// A state change requested by a billing event or an explicit agent action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingTransition {
    PaymentSucceeded {
        period_start: DateTime<Utc>,
        period_end: Option<DateTime<Utc>>,
    },
    SubscriptionUpdated {
        state: ProviderState,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    },
    SubscriptionDeleted {
        at: DateTime<Utc>,
    },
    PaymentFailed,
    CancelAtPeriodEnd,
    Reactivate {
        now: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    Ignored,
}

impl TransitionOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Ignored => "ignored",
        }
    }
}

/// Applies one transition in place. Status and dates always move together.
pub fn apply(fields: &mut SubscriptionFields, transition: &BillingTransition) -> TransitionOutcome {
    use SubscriptionStatus::{Active, Cancelled, Expired, Trial};

    match *transition {
        BillingTransition::PaymentSucceeded {
            period_start,
            period_end,
        } => {
            if fields.status != Active || fields.subscription_start.is_none() {
                fields.subscription_start = Some(period_start);
            }
            if period_end.is_some() {
                fields.subscription_end = period_end;
            }
            fields.status = Active;
            TransitionOutcome::Applied
        }
        BillingTransition::SubscriptionUpdated {
            state,
            period_start,
            period_end,
            cancel_at_period_end,
        } => match (state, fields.status) {
            // A late `active` update must not undo a cancellation.
            (ProviderState::Live, Trial | Expired | Active) => {
                fields.status = Active;
                if period_start.is_some() {
                    fields.subscription_start = period_start;
                }
                if period_end.is_some() {
                    fields.subscription_end = period_end;
                }
                fields.cancel_at_period_end = cancel_at_period_end;
                TransitionOutcome::Applied
            }
            (ProviderState::Canceled, Active) => {
                fields.status = Cancelled;
                if period_end.is_some() {
                    fields.subscription_end = period_end;
                }
                fields.cancel_at_period_end = false;
                TransitionOutcome::Applied
            }
            (ProviderState::Delinquent, Active | Cancelled) => {
                fields.status = Expired;
                TransitionOutcome::Applied
            }
            _ => TransitionOutcome::Ignored,
        },
        BillingTransition::SubscriptionDeleted { at } => match fields.status {
            Active | Expired => {
                fields.status = Cancelled;
                fields.subscription_end = Some(at);
                fields.cancel_at_period_end = false;
                TransitionOutcome::Applied
            }
            Trial | Cancelled => TransitionOutcome::Ignored,
        },
        BillingTransition::PaymentFailed => match fields.status {
            Active | Cancelled => {
                fields.status = Expired;
                TransitionOutcome::Applied
            }
            Trial | Expired => TransitionOutcome::Ignored,
        },
        BillingTransition::CancelAtPeriodEnd => {
            if fields.status == Active && !fields.cancel_at_period_end {
                fields.cancel_at_period_end = true;
                TransitionOutcome::Applied
            } else {
                TransitionOutcome::Ignored
            }
        }
        BillingTransition::Reactivate { now } => match fields.status {
            Active if fields.cancel_at_period_end => {
                fields.cancel_at_period_end = false;
                TransitionOutcome::Applied
            }
            Cancelled if fields.subscription_end.is_some_and(|end| end > now) => {
                fields.status = Active;
                fields.cancel_at_period_end = false;
                TransitionOutcome::Applied
            }
            _ => TransitionOutcome::Ignored,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_trial_runs_seven_days() {
        let fields = SubscriptionFields::new_trial(t0());
        assert_eq!(fields.status, SubscriptionStatus::Trial);
        assert_eq!(fields.trial_end - fields.trial_start, Duration::days(7));
        assert!(is_entitled(&fields, t0()));
        assert_eq!(days_remaining(&fields, t0()), 7);
    }

    #[test]
    fn trial_boundary_is_inclusive() {
        let fields = SubscriptionFields::new_trial(t0());
        assert!(is_trial_active(&fields, fields.trial_end));
        assert!(!is_trial_active(&fields, fields.trial_end + Duration::seconds(1)));
    }

    #[test]
    fn days_remaining_rounds_up_partial_days() {
        let fields = SubscriptionFields::new_trial(t0());
        let now = t0() + Duration::days(6) + Duration::hours(1);
        assert_eq!(days_remaining(&fields, now), 1);
        assert_eq!(days_remaining(&fields, t0() + Duration::days(8)), 0);
    }

    #[test]
    fn expired_trial_is_denied_with_trial_expired() {
        let fields = SubscriptionFields::new_trial(t0());
        let later = t0() + Duration::days(8);
        let snapshot = EntitlementSnapshot::evaluate(&fields, later);
        assert!(!snapshot.can_generate);
        assert_eq!(snapshot.trial_days_remaining, 0);
        assert_eq!(snapshot.reason, Some(DenialReason::TrialExpired));
    }

    #[test]
    fn status_wins_over_future_subscription_end() {
        let mut fields = SubscriptionFields::new_trial(t0());
        fields.status = SubscriptionStatus::Cancelled;
        fields.subscription_end = Some(t0() + Duration::days(300));
        assert!(!is_entitled(&fields, t0()));
        assert_eq!(denial_reason(&fields, t0()), Some(DenialReason::NoSubscription));

        fields.status = SubscriptionStatus::Expired;
        assert!(!is_entitled(&fields, t0()));
    }

    #[test]
    fn entitlement_matches_status_table() {
        let now = t0() + Duration::days(3);
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            for offset in [0, 10] {
                let mut fields = SubscriptionFields::new_trial(t0());
                fields.status = status;
                let at = now + Duration::days(offset);
                let expected = !(matches!(
                    status,
                    SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
                ) || (status == SubscriptionStatus::Trial && at > fields.trial_end));
                assert_eq!(is_entitled(&fields, at), expected, "{status} +{offset}d");
            }
        }
    }

    #[test]
    fn payment_succeeded_activates_expired_trial() {
        let mut fields = SubscriptionFields::new_trial(t0());
        let paid_at = t0() + Duration::days(8);
        let outcome = apply(
            &mut fields,
            &BillingTransition::PaymentSucceeded {
                period_start: paid_at,
                period_end: Some(paid_at + Duration::days(30)),
            },
        );
        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(fields.status, SubscriptionStatus::Active);
        assert_eq!(fields.subscription_start, Some(paid_at));
        assert!(is_entitled(&fields, paid_at));
    }

    #[test]
    fn renewal_keeps_original_start() {
        let mut fields = SubscriptionFields::new_trial(t0());
        let first = t0() + Duration::days(1);
        apply(
            &mut fields,
            &BillingTransition::PaymentSucceeded {
                period_start: first,
                period_end: Some(first + Duration::days(30)),
            },
        );
        let second = first + Duration::days(30);
        apply(
            &mut fields,
            &BillingTransition::PaymentSucceeded {
                period_start: second,
                period_end: Some(second + Duration::days(30)),
            },
        );
        assert_eq!(fields.subscription_start, Some(first));
        assert_eq!(fields.subscription_end, Some(second + Duration::days(30)));
    }

    #[test]
    fn deferred_cancel_keeps_agent_active() {
        let mut fields = SubscriptionFields::new_trial(t0());
        fields.status = SubscriptionStatus::Active;
        assert_eq!(
            apply(&mut fields, &BillingTransition::CancelAtPeriodEnd),
            TransitionOutcome::Applied
        );
        assert_eq!(fields.status, SubscriptionStatus::Active);
        assert!(fields.cancel_at_period_end);
        assert_eq!(
            apply(&mut fields, &BillingTransition::CancelAtPeriodEnd),
            TransitionOutcome::Ignored
        );

        assert_eq!(
            apply(&mut fields, &BillingTransition::Reactivate { now: t0() }),
            TransitionOutcome::Applied
        );
        assert!(!fields.cancel_at_period_end);
    }

    #[test]
    fn reactivate_cancelled_only_before_period_end() {
        let mut fields = SubscriptionFields::new_trial(t0());
        fields.status = SubscriptionStatus::Cancelled;
        fields.subscription_end = Some(t0() + Duration::days(5));

        let late = t0() + Duration::days(6);
        assert_eq!(
            apply(&mut fields, &BillingTransition::Reactivate { now: late }),
            TransitionOutcome::Ignored
        );
        assert_eq!(fields.status, SubscriptionStatus::Cancelled);

        assert_eq!(
            apply(&mut fields, &BillingTransition::Reactivate { now: t0() }),
            TransitionOutcome::Applied
        );
        assert_eq!(fields.status, SubscriptionStatus::Active);
    }

    #[test]
    fn payment_failed_expires_active_only() {
        let mut fields = SubscriptionFields::new_trial(t0());
        assert_eq!(
            apply(&mut fields, &BillingTransition::PaymentFailed),
            TransitionOutcome::Ignored
        );
        assert_eq!(fields.status, SubscriptionStatus::Trial);

        fields.status = SubscriptionStatus::Active;
        apply(&mut fields, &BillingTransition::PaymentFailed);
        assert_eq!(fields.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn deletion_and_provider_updates() {
        let mut fields = SubscriptionFields::new_trial(t0());
        fields.status = SubscriptionStatus::Active;
        fields.cancel_at_period_end = true;
        let at = t0() + Duration::days(40);
        apply(&mut fields, &BillingTransition::SubscriptionDeleted { at });
        assert_eq!(fields.status, SubscriptionStatus::Cancelled);
        assert_eq!(fields.subscription_end, Some(at));
        assert!(!fields.cancel_at_period_end);

        let outcome = apply(
            &mut fields,
            &BillingTransition::SubscriptionUpdated {
                state: ProviderState::Canceled,
                period_start: None,
                period_end: None,
                cancel_at_period_end: false,
            },
        );
        assert_eq!(outcome, TransitionOutcome::Ignored);

        apply(
            &mut fields,
            &BillingTransition::SubscriptionUpdated {
                state: ProviderState::Delinquent,
                period_start: None,
                period_end: None,
                cancel_at_period_end: false,
            },
        );
        assert_eq!(fields.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn late_active_update_does_not_revive_cancelled() {
        let mut fields = SubscriptionFields::new_trial(t0());
        fields.status = SubscriptionStatus::Active;
        let at = t0() + Duration::days(20);
        apply(&mut fields, &BillingTransition::SubscriptionDeleted { at });
        assert_eq!(fields.status, SubscriptionStatus::Cancelled);

        let stale = BillingTransition::SubscriptionUpdated {
            state: ProviderState::Live,
            period_start: Some(t0()),
            period_end: Some(t0() + Duration::days(30)),
            cancel_at_period_end: false,
        };
        assert_eq!(apply(&mut fields, &stale), TransitionOutcome::Ignored);
        assert_eq!(fields.status, SubscriptionStatus::Cancelled);
        assert_eq!(fields.subscription_end, Some(at));
        assert!(!is_entitled(&fields, t0() + Duration::days(21)));

        // A confirmed payment still brings the agent back.
        apply(
            &mut fields,
            &BillingTransition::PaymentSucceeded {
                period_start: t0() + Duration::days(22),
                period_end: Some(t0() + Duration::days(52)),
            },
        );
        assert_eq!(fields.status, SubscriptionStatus::Active);
    }

    #[test]
    fn provider_state_mapping() {
        assert_eq!(ProviderState::from_provider("trialing"), ProviderState::Live);
        assert_eq!(ProviderState::from_provider("unpaid"), ProviderState::Delinquent);
        assert_eq!(ProviderState::from_provider("incomplete"), ProviderState::Other);
    }
}
