//! Prompt construction for text and image generation.
//!
//! Everything here is a pure function of its inputs and the fixed tables
//! below, so the exact text sent upstream can be asserted in tests.

use chrono::{Datelike, NaiveDate};

use super::ContentRequest;
use crate::domain::InsuranceFocus;

pub const SYSTEM_PROMPT: &str = "You are an expert social media content creator specializing in insurance marketing for licensed insurance agents.

Your expertise includes:
- Creating compliant, engaging content that builds trust and relationships
- Understanding insurance regulations and avoiding misleading claims
- Crafting content that resonates with warm market audiences (friends, family, existing contacts)
- Incorporating current events, seasonal themes, and life events naturally
- Balancing educational value with personal connection

Always respond with valid JSON in the exact format requested. Focus on relationship-building rather than direct sales.";

const GENERAL_THEMES: [&str; 3] = ["financial literacy", "family protection", "peace of mind"];

const IMAGE_STYLE: [&str; 5] = [
    "professional but approachable",
    "clean modern design",
    "warm and trustworthy feeling",
    "suitable for social media",
    "high quality and polished",
];

const DEFAULT_VISUALS: &str = "financial security, trust, protection";

const POST_EXCERPT_CHARS: usize = 100;

/// System and user messages for one text completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPrompt {
    pub system: &'static str,
    pub user: String,
}

#[must_use]
pub fn month_themes(month: u32) -> [&'static str; 3] {
    match month {
        1 => ["New Year resolutions", "fresh starts", "financial planning"],
        2 => ["Heart health", "Valentine's Day", "love and protection"],
        3 => ["Spring cleaning", "renewal", "Women's History Month"],
        4 => ["Easter", "spring renewal", "tax season"],
        5 => ["Mother's Day", "graduation season", "spring activities"],
        6 => ["Father's Day", "graduation", "summer planning"],
        7 => ["summer vacation", "family time", "Independence Day"],
        8 => ["back to school", "summer activities", "family preparation"],
        9 => [
            "Life Insurance Awareness Month",
            "back to school",
            "fall preparation",
        ],
        10 => ["Halloween", "autumn", "Breast Cancer Awareness"],
        11 => ["Thanksgiving", "gratitude", "family gatherings"],
        _ => ["holidays", "year-end planning", "family traditions"],
    }
}

/// Meteorological season (northern hemisphere).
#[must_use]
pub const fn season(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3..=5 => "Spring",
        6..=8 => "Summer",
        _ => "Fall",
    }
}

#[must_use]
pub fn seasonal_themes(date: NaiveDate) -> Vec<&'static str> {
    let mut themes = month_themes(date.month()).to_vec();
    themes.extend(GENERAL_THEMES);
    themes
}

#[must_use]
pub fn build_content_prompt(request: &ContentRequest) -> ContentPrompt {
    let week_start = request.week.start;
    let week_end = request.week.end;

    let types_text = request
        .insurance_types
        .iter()
        .map(InsuranceFocus::description)
        .collect::<Vec<_>>()
        .join(", ");

    let additional = if request.additional_instructions.trim().is_empty() {
        "None specified"
    } else {
        request.additional_instructions.trim()
    };

    let user = format!(
        r##"
Create 7 social media posts (one for each day from {from} to {to}) for an insurance agent who specializes in: {types_text}

REQUIREMENTS:
- Tone: {tone}
- Target: Warm market (people who already know and trust the agent)
- Focus: Education, relationship building, trust development
- Compliance: No misleading claims, avoid pressure tactics
- Variety: Mix educational, personal, seasonal, and industry insights
- Current context: {month}, {season}, {themes}

CONTENT GUIDELINES:
1. Educational posts: Explain insurance concepts simply
2. Personal posts: Share relatable stories or experiences
3. Seasonal posts: Connect insurance to current events/seasons
4. Industry insights: Share relevant news or trends
5. Community posts: Highlight local events or causes
6. Testimonial-style: Share success stories (anonymized)
7. Question posts: Engage audience with thoughtful questions

Additional requirements: {additional}

RESPONSE FORMAT (JSON array with exactly 7 objects):
[
  {{
    "day": 1,
    "post_text": "Engaging post text with natural hashtags integrated",
    "image_description": "Detailed description for AI image generation",
    "hashtags": ["#InsuranceEducation", "#LifeInsurance", "#FinancialPlanning"],
    "insurance_focus": "mortgage_protection",
    "content_theme": "educational",
    "engagement_hook": "Question or call-to-action to encourage interaction"
  }}
]

Ensure each post is unique, valuable, and builds trust without being salesy.
"##,
        from = week_start.format("%B %d"),
        to = week_end.format("%B %d, %Y"),
        tone = request.tone.label(),
        month = week_start.format("%B"),
        season = season(week_start.month()),
        themes = seasonal_themes(week_start).join(", "),
    );

    ContentPrompt {
        system: SYSTEM_PROMPT,
        user,
    }
}

/// Image prompt for a single post.
#[must_use]
pub fn build_image_prompt(
    post_text: &str,
    image_description: &str,
    focus: Option<InsuranceFocus>,
) -> String {
    let visuals = focus.map_or(DEFAULT_VISUALS, |f| f.visual_elements());
    let excerpt: String = post_text.chars().take(POST_EXCERPT_CHARS).collect();

    format!(
        r#"
Create a professional social media image that is {style}.

Image concept: {image_description}

Visual elements to include: {visuals}

Style requirements:
- Avoid overly corporate or stock photo appearance
- Include subtle insurance/financial themes
- Use calming, trustworthy colors (blues, greens, warm neutrals)
- Ensure text overlay space if needed
- Make it engaging and scroll-stopping
- Suitable for LinkedIn, Facebook, and Instagram

The image should complement this social media post: "{excerpt}..."

Avoid: Generic stock photos, overly salesy imagery, complex charts, small text
"#,
        style = IMAGE_STYLE.join(", "),
    )
}
