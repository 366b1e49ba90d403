//! Domain types for the content platform with strong typing.
//!
//! Identifiers follow the newtype pattern so an agent id can never be passed
//! where a schedule id is expected. The fixed enumerations (focus categories,
//! tones, subscription status) are validated once at the boundary and carried
//! as typed values everywhere else.

pub mod entitlement;
pub mod week;

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                debug_assert!(id >= 0, concat!(stringify!($name), " should be non-negative"));
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i32(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let id = i32::deserialize(deserializer)?;
                Ok(Self::new(id))
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for an agent (the paying insurance salesperson).
    AgentId
);
id_newtype!(
    /// Unique identifier for one weekly content schedule.
    ScheduleId
);
id_newtype!(
    /// Unique identifier for one day's post inside a schedule.
    PostId
);

/// Returned when a string does not name a member of one of the fixed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Insurance product line a post is themed around.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InsuranceFocus {
    #[sea_orm(string_value = "mortgage_protection")]
    MortgageProtection,
    #[sea_orm(string_value = "index_universal_life")]
    IndexUniversalLife,
    #[sea_orm(string_value = "term_life_living_benefits")]
    TermLifeLivingBenefits,
    #[sea_orm(string_value = "final_expense")]
    FinalExpense,
    #[sea_orm(string_value = "annuities")]
    Annuities,
    #[sea_orm(string_value = "health_insurance")]
    HealthInsurance,
}

impl InsuranceFocus {
    pub const ALL: [Self; 6] = [
        Self::MortgageProtection,
        Self::IndexUniversalLife,
        Self::TermLifeLivingBenefits,
        Self::FinalExpense,
        Self::Annuities,
        Self::HealthInsurance,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MortgageProtection => "mortgage_protection",
            Self::IndexUniversalLife => "index_universal_life",
            Self::TermLifeLivingBenefits => "term_life_living_benefits",
            Self::FinalExpense => "final_expense",
            Self::Annuities => "annuities",
            Self::HealthInsurance => "health_insurance",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MortgageProtection => "Mortgage Protection",
            Self::IndexUniversalLife => "Index Universal Life",
            Self::TermLifeLivingBenefits => "Term Life with Living Benefits",
            Self::FinalExpense => "Final Expense",
            Self::Annuities => "Annuities",
            Self::HealthInsurance => "Health Insurance",
        }
    }

    /// Human-readable description handed to the text generator.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::MortgageProtection => {
                "Mortgage Protection Insurance - helps pay off mortgage if policyholder dies"
            }
            Self::IndexUniversalLife => {
                "Index Universal Life Insurance - permanent life insurance with investment component"
            }
            Self::TermLifeLivingBenefits => {
                "Term Life Insurance with Living Benefits - temporary coverage with accelerated death benefits"
            }
            Self::FinalExpense => "Final Expense Insurance - covers funeral and burial costs",
            Self::Annuities => "Annuities - retirement income products for secure retirement",
            Self::HealthInsurance => "Health Insurance - medical coverage and benefits",
        }
    }

    /// Visual vocabulary used when building image prompts.
    #[must_use]
    pub const fn visual_elements(&self) -> &'static str {
        match self {
            Self::MortgageProtection => "family home, protection shield, happy family",
            Self::IndexUniversalLife => "growth charts, financial security, future planning",
            Self::TermLifeLivingBenefits => "family protection, life stages, security umbrella",
            Self::FinalExpense => "dignity, peace of mind, family comfort",
            Self::Annuities => "retirement lifestyle, financial freedom, golden years",
            Self::HealthInsurance => "healthcare, wellness, medical protection",
        }
    }
}

impl fmt::Display for InsuranceFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsuranceFocus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|focus| focus.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "insurance type",
                value: s.to_string(),
            })
    }
}

/// Voice the generated posts are written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[sea_orm(string_value = "professional")]
    Professional,
    #[sea_orm(string_value = "friendly")]
    Friendly,
    #[sea_orm(string_value = "direct")]
    Direct,
    #[sea_orm(string_value = "serious")]
    Serious,
    #[sea_orm(string_value = "funny")]
    Funny,
    #[sea_orm(string_value = "urgent")]
    Urgent,
    #[sea_orm(string_value = "sarcastic")]
    Sarcastic,
}

impl Tone {
    pub const ALL: [Self; 7] = [
        Self::Professional,
        Self::Friendly,
        Self::Direct,
        Self::Serious,
        Self::Funny,
        Self::Urgent,
        Self::Sarcastic,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Direct => "direct",
            Self::Serious => "serious",
            Self::Funny => "funny",
            Self::Urgent => "urgent",
            Self::Sarcastic => "sarcastic",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Professional => "Professional",
            Self::Friendly => "Friendly",
            Self::Direct => "Direct",
            Self::Serious => "Serious",
            Self::Funny => "Funny",
            Self::Urgent => "Urgent",
            Self::Sarcastic => "Sarcastic",
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::Professional
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tone| tone.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "tone",
                value: s.to_string(),
            })
    }
}

/// Subscription state of an agent. Authoritative for entitlement; the date
/// fields on the agent never override it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "trial")]
    Trial,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a list of category names, rejecting the first unknown one.
pub fn parse_focus_list<S: AsRef<str>>(values: &[S]) -> Result<Vec<InsuranceFocus>, UnknownVariant> {
    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let focus = value.as_ref().parse::<InsuranceFocus>()?;
        if !parsed.contains(&focus) {
            parsed.push(focus);
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_newtypes_round_trip_through_i32() {
        let id = AgentId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(ScheduleId::from(7).value(), 7);
        assert_eq!(serde_json::to_string(&PostId::new(3)).unwrap(), "3");
    }

    #[test]
    fn focus_parses_every_enumerated_value() {
        for focus in InsuranceFocus::ALL {
            assert_eq!(focus.as_str().parse::<InsuranceFocus>().unwrap(), focus);
        }
        let err = "car_insurance".parse::<InsuranceFocus>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid insurance type: car_insurance");
    }

    #[test]
    fn tone_parses_every_enumerated_value() {
        assert_eq!(Tone::ALL.len(), 7);
        for tone in Tone::ALL {
            assert_eq!(tone.as_str().parse::<Tone>().unwrap(), tone);
        }
        assert!("Urgent".parse::<Tone>().is_err());
    }

    #[test]
    fn focus_list_deduplicates_and_preserves_order() {
        let parsed = parse_focus_list(&["annuities", "mortgage_protection", "annuities"]).unwrap();
        assert_eq!(
            parsed,
            vec![InsuranceFocus::Annuities, InsuranceFocus::MortgageProtection]
        );
        assert!(parse_focus_list(&["annuities", "boats"]).is_err());
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&InsuranceFocus::TermLifeLivingBenefits).unwrap(),
            "\"term_life_living_benefits\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
