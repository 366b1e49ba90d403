//! Normalizes the generator's free-text answer into exactly seven posts.
//!
//! The upstream text is untrusted: it may be valid JSON, JSON wrapped in
//! prose, a short or long array, objects with missing or mistyped fields, or
//! garbage. Every path out of [`repair_response`] yields seven well-formed
//! drafts dated across the requested week.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::InsuranceFocus;
use crate::domain::week::Week;

pub const POSTS_PER_WEEK: usize = 7;
pub const MAX_HASHTAGS: usize = 10;

pub const DEFAULT_IMAGE_DESCRIPTION: &str = "Professional insurance-related image";
pub const DEFAULT_CONTENT_THEME: &str = "general";
pub const DEFAULT_ENGAGEMENT_HOOK: &str = "What are your thoughts?";
const MISSING_HASHTAGS: [&str; 2] = ["#Insurance", "#FinancialPlanning"];
const EMPTY_HASHTAGS: [&str; 3] = ["#Insurance", "#FinancialPlanning", "#TrustYourAgent"];

fn json_array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("Invalid regex"))
}

/// One day's post after repair, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub day: u32,
    pub post_date: NaiveDate,
    pub post_text: String,
    pub image_description: String,
    pub hashtags: Vec<String>,
    pub insurance_focus: Option<InsuranceFocus>,
    pub content_theme: String,
    pub engagement_hook: String,
}

/// Which parse path produced the raw posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Strict,
    Extracted,
    Fallback,
}

impl ResponseSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Extracted => "extracted",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepairedSchedule {
    pub posts: Vec<PostDraft>,
    pub source: ResponseSource,
}

struct FallbackPost {
    text: &'static str,
    image_description: &'static str,
    hashtags: [&'static str; 3],
    focus: &'static str,
    theme: &'static str,
    hook: &'static str,
}

const FALLBACK_POSTS: [FallbackPost; POSTS_PER_WEEK] = [
    FallbackPost {
        text: "Starting the week thinking about the importance of protecting what matters most. Your family, your home, your future - they all deserve the security that comes with proper planning. What's your biggest financial priority right now? #FinancialPlanning #FamilyFirst",
        image_description: "Warm family scene with protection theme",
        hashtags: ["#FinancialPlanning", "#FamilyFirst", "#Insurance"],
        focus: "term_life_living_benefits",
        theme: "educational",
        hook: "What's your biggest financial priority right now?",
    },
    FallbackPost {
        text: "Did you know that many people are just one unexpected event away from financial hardship? It's not about being pessimistic - it's about being prepared. Small steps today can make a huge difference tomorrow. #FinancialWisdom #BePrepared",
        image_description: "Umbrella protecting from storm, financial security concept",
        hashtags: ["#FinancialWisdom", "#BePrepared", "#Insurance"],
        focus: "mortgage_protection",
        theme: "educational",
        hook: "What small step will you take today?",
    },
    FallbackPost {
        text: "Your home is more than a mortgage payment. It's where the memories live. Making sure your family could stay there no matter what is one of the kindest plans you can make. #HomeSweetHome #Protection",
        image_description: "Family laughing on the front steps of their home",
        hashtags: ["#HomeSweetHome", "#Protection", "#Insurance"],
        focus: "mortgage_protection",
        theme: "personal",
        hook: "What does home mean to you?",
    },
    FallbackPost {
        text: "Retirement should feel like a reward, not a worry. A steady income you can't outlive changes how those golden years look. #RetirementPlanning #FinancialFreedom",
        image_description: "Retired couple walking on a beach at sunset",
        hashtags: ["#RetirementPlanning", "#FinancialFreedom", "#Insurance"],
        focus: "annuities",
        theme: "educational",
        hook: "What are you most looking forward to in retirement?",
    },
    FallbackPost {
        text: "Health is wealth. Having the right coverage means you can focus on getting better instead of worrying about the bills. #HealthIsWealth #PeaceOfMind",
        image_description: "Bright clinic waiting room with a smiling family",
        hashtags: ["#HealthIsWealth", "#PeaceOfMind", "#Insurance"],
        focus: "health_insurance",
        theme: "educational",
        hook: "How do you prioritize your family's health?",
    },
    FallbackPost {
        text: "Grateful for every family I've helped plan for the unexpected this year. Nothing beats hearing 'we're so glad we did this.' #Gratitude #TrustYourAgent",
        image_description: "Handshake between an agent and a happy client at a kitchen table",
        hashtags: ["#Gratitude", "#TrustYourAgent", "#Insurance"],
        focus: "index_universal_life",
        theme: "testimonial",
        hook: "Who has helped you feel more secure lately?",
    },
    FallbackPost {
        text: "Remember, financial planning isn't just about money - it's about peace of mind and protecting the people you love. #FinancialPlanning #PeaceOfMind",
        image_description: "Professional financial planning concept",
        hashtags: ["#FinancialPlanning", "#PeaceOfMind", "#Insurance"],
        focus: "final_expense",
        theme: "general",
        hook: "How do you find peace of mind in your financial planning?",
    },
];

impl FallbackPost {
    fn to_value(&self) -> Value {
        serde_json::json!({
            "post_text": self.text,
            "image_description": self.image_description,
            "hashtags": self.hashtags,
            "insurance_focus": self.focus,
            "content_theme": self.theme,
            "engagement_hook": self.hook,
        })
    }
}

/// Repairs the generator's raw answer into exactly seven drafts for `week`.
///
/// `requested` must be non-empty; callers validate it at the boundary.
#[must_use]
pub fn repair_response(raw: &str, week: &Week, requested: &[InsuranceFocus]) -> RepairedSchedule {
    let (mut items, source) = match parse_strict(raw) {
        Some(items) => (items, ResponseSource::Strict),
        None => match parse_extracted(raw) {
            Some(items) => (items, ResponseSource::Extracted),
            None => (fallback_items(), ResponseSource::Fallback),
        },
    };

    items.truncate(POSTS_PER_WEEK);
    while items.len() < POSTS_PER_WEEK {
        let slot = items.len();
        items.push(FALLBACK_POSTS[slot % POSTS_PER_WEEK].to_value());
    }

    let posts = items
        .iter()
        .enumerate()
        .map(|(index, item)| repair_post(index, item, week, requested))
        .collect();

    RepairedSchedule { posts, source }
}

fn parse_strict(raw: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn parse_extracted(raw: &str) -> Option<Vec<Value>> {
    let candidate = json_array_regex().find(raw)?;
    match serde_json::from_str::<Value>(candidate.as_str()) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn fallback_items() -> Vec<Value> {
    FALLBACK_POSTS.iter().map(FallbackPost::to_value).collect()
}

fn repair_post(index: usize, item: &Value, week: &Week, requested: &[InsuranceFocus]) -> PostDraft {
    let empty = Map::new();
    let fields = item.as_object().unwrap_or(&empty);

    let text_field = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

    let hashtags = match fields.get("hashtags") {
        None | Some(Value::Null) => clean_hashtags(MISSING_HASHTAGS),
        Some(Value::Array(tags)) => clean_hashtags(tags.iter().filter_map(Value::as_str)),
        Some(Value::String(joined)) => clean_hashtags(joined.split_whitespace()),
        Some(_) => clean_hashtags(std::iter::empty::<&str>()),
    };

    let claimed = fields
        .get("insurance_focus")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<InsuranceFocus>().ok())
        .filter(|focus| requested.contains(focus));
    let insurance_focus = claimed.or_else(|| pick_focus(requested, week.start, index));

    PostDraft {
        day: u32::try_from(index + 1).unwrap_or(u32::MAX),
        post_date: week.day(index),
        post_text: text_field("post_text").unwrap_or_default(),
        image_description: text_field("image_description")
            .unwrap_or_else(|| DEFAULT_IMAGE_DESCRIPTION.to_string()),
        hashtags,
        insurance_focus,
        content_theme: text_field("content_theme")
            .unwrap_or_else(|| DEFAULT_CONTENT_THEME.to_string()),
        engagement_hook: text_field("engagement_hook")
            .unwrap_or_else(|| DEFAULT_ENGAGEMENT_HOOK.to_string()),
    }
}

/// Reproducible pick from the requested set, seeded by week and day.
fn pick_focus(requested: &[InsuranceFocus], week_start: NaiveDate, index: usize) -> Option<InsuranceFocus> {
    let seed = (u64::from(week_start.num_days_from_ce().unsigned_abs()) << 8) | index as u64;
    let mut rng = StdRng::seed_from_u64(seed);
    requested.choose(&mut rng).copied()
}

/// Normalizes hashtags: one leading `#`, alphanumerics only, no bare `#`,
/// a fixed default set when nothing survives, at most ten in input order.
pub fn clean_hashtags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cleaned: Vec<String> = tags
        .into_iter()
        .filter_map(|tag| {
            let body: String = tag
                .as_ref()
                .trim_start_matches('#')
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect();
            (!body.is_empty()).then(|| format!("#{body}"))
        })
        .collect();

    if cleaned.is_empty() {
        cleaned = EMPTY_HASHTAGS.iter().map(ToString::to_string).collect();
    }
    cleaned.truncate(MAX_HASHTAGS);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::week::parse_date;

    fn week() -> Week {
        Week::containing(parse_date("2024-09-23").unwrap()).unwrap()
    }

    const REQUESTED: [InsuranceFocus; 2] =
        [InsuranceFocus::MortgageProtection, InsuranceFocus::Annuities];

    fn assert_week_shape(repaired: &RepairedSchedule) {
        assert_eq!(repaired.posts.len(), POSTS_PER_WEEK);
        let week = week();
        for (i, post) in repaired.posts.iter().enumerate() {
            assert_eq!(post.day as usize, i + 1);
            assert_eq!(post.post_date, week.day(i));
            let focus = post.insurance_focus.unwrap();
            assert!(REQUESTED.contains(&focus), "{focus} not requested");
            assert!(!post.hashtags.is_empty());
            assert!(post.hashtags.len() <= MAX_HASHTAGS);
        }
        assert_eq!(repaired.posts[6].post_date, parse_date("2024-09-29").unwrap());
    }

    fn post_json(text: &str, focus: &str) -> Value {
        serde_json::json!({
            "day": 1,
            "post_text": text,
            "image_description": "A house",
            "hashtags": ["#Home"],
            "insurance_focus": focus,
            "content_theme": "educational",
            "engagement_hook": "Thoughts?"
        })
    }

    #[test]
    fn strict_array_of_seven() {
        let items: Vec<_> = (0..7)
            .map(|i| post_json(&format!("post {i}"), "annuities"))
            .collect();
        let raw = serde_json::to_string(&items).unwrap();
        let repaired = repair_response(&raw, &week(), &REQUESTED);
        assert_eq!(repaired.source, ResponseSource::Strict);
        assert_week_shape(&repaired);
        assert_eq!(repaired.posts[3].post_text, "post 3");
        assert_eq!(repaired.posts[3].image_description, "A house");
        assert_eq!(repaired.posts[3].insurance_focus, Some(InsuranceFocus::Annuities));
    }

    #[test]
    fn prose_wrapped_array_is_extracted() {
        let items: Vec<_> = (0..7).map(|_| post_json("hi", "annuities")).collect();
        let raw = format!(
            "Sure! Here are your posts:\n```json\n{}\n```\nEnjoy.",
            serde_json::to_string_pretty(&items).unwrap()
        );
        let repaired = repair_response(&raw, &week(), &REQUESTED);
        assert_eq!(repaired.source, ResponseSource::Extracted);
        assert_week_shape(&repaired);
        assert_eq!(repaired.posts[0].post_text, "hi");
    }

    #[test]
    fn garbage_uses_builtin_posts() {
        for raw in ["I cannot help with that.", "", "[not json]", "{\"a\": 1}"] {
            let repaired = repair_response(raw, &week(), &REQUESTED);
            assert_eq!(repaired.source, ResponseSource::Fallback, "{raw:?}");
            assert_week_shape(&repaired);
            assert!(repaired.posts.iter().all(|p| !p.post_text.is_empty()));
        }
    }

    #[test]
    fn long_array_is_truncated() {
        let items: Vec<_> = (0..12)
            .map(|i| post_json(&format!("post {i}"), "annuities"))
            .collect();
        let raw = serde_json::to_string(&items).unwrap();
        let repaired = repair_response(&raw, &week(), &REQUESTED);
        assert_week_shape(&repaired);
        assert_eq!(repaired.posts[6].post_text, "post 6");
    }

    #[test]
    fn short_array_is_padded_from_fallback() {
        let raw = serde_json::to_string(&vec![post_json("only one", "annuities")]).unwrap();
        let repaired = repair_response(&raw, &week(), &REQUESTED);
        assert_eq!(repaired.source, ResponseSource::Strict);
        assert_week_shape(&repaired);
        assert_eq!(repaired.posts[0].post_text, "only one");
        assert_eq!(repaired.posts[1].post_text, FALLBACK_POSTS[1].text);

        let empty = repair_response("[]", &week(), &REQUESTED);
        assert_week_shape(&empty);
        assert_eq!(empty.posts[0].post_text, FALLBACK_POSTS[0].text);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = "[{}, 42, null, {\"post_text\": 7}]";
        let repaired = repair_response(raw, &week(), &REQUESTED);
        assert_week_shape(&repaired);
        let first = &repaired.posts[0];
        assert_eq!(first.post_text, "");
        assert_eq!(first.image_description, DEFAULT_IMAGE_DESCRIPTION);
        assert_eq!(first.hashtags, vec!["#Insurance", "#FinancialPlanning"]);
        assert_eq!(first.content_theme, DEFAULT_CONTENT_THEME);
        assert_eq!(first.engagement_hook, DEFAULT_ENGAGEMENT_HOOK);
        assert_eq!(repaired.posts[3].post_text, "");
    }

    #[test]
    fn foreign_focus_is_replaced_with_requested_one() {
        let items: Vec<_> = (0..7).map(|_| post_json("x", "health_insurance")).collect();
        let raw = serde_json::to_string(&items).unwrap();
        assert_week_shape(&repair_response(&raw, &week(), &REQUESTED));

        let unknown: Vec<_> = (0..7).map(|_| post_json("x", "pet_insurance")).collect();
        let raw = serde_json::to_string(&unknown).unwrap();
        assert_week_shape(&repair_response(&raw, &week(), &REQUESTED));
    }

    #[test]
    fn focus_repair_is_reproducible() {
        let a = repair_response("garbage", &week(), &REQUESTED);
        let b = repair_response("garbage", &week(), &REQUESTED);
        let focus = |r: &RepairedSchedule| r.posts.iter().map(|p| p.insurance_focus).collect::<Vec<_>>();
        assert_eq!(focus(&a), focus(&b));
    }

    #[test]
    fn hashtag_cleaning_rules() {
        assert_eq!(clean_hashtags(["bad tag!", "", "#Ok"]), vec!["#badtag", "#Ok"]);
        assert_eq!(clean_hashtags(["#", "!!", " "]), EMPTY_HASHTAGS.to_vec());
        assert_eq!(clean_hashtags(Vec::<String>::new()), EMPTY_HASHTAGS.to_vec());
        assert_eq!(clean_hashtags(["##double", "Life-Insurance"]), vec![
            "#double",
            "#LifeInsurance"
        ]);

        let many: Vec<String> = (0..15).map(|i| format!("tag{i}")).collect();
        let cleaned = clean_hashtags(&many);
        assert_eq!(cleaned.len(), MAX_HASHTAGS);
        assert_eq!(cleaned[0], "#tag0");
        assert_eq!(cleaned[9], "#tag9");
    }

    #[test]
    fn hashtags_given_as_string_or_wrong_type() {
        let raw = r##"[{"hashtags": "#one two"}, {"hashtags": 5}]"##;
        let repaired = repair_response(raw, &week(), &REQUESTED);
        assert_eq!(repaired.posts[0].hashtags, vec!["#one", "#two"]);
        assert_eq!(repaired.posts[1].hashtags, EMPTY_HASHTAGS.to_vec());
    }
}
