//! Content pipeline building blocks: prompt construction and repair of the
//! generator's untrusted output.

pub mod prompt;
pub mod repair;

use crate::domain::week::Week;
use crate::domain::{InsuranceFocus, Tone};

/// Fully validated input for one weekly generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub insurance_types: Vec<InsuranceFocus>,
    pub tone: Tone,
    pub additional_instructions: String,
    pub week: Week,
}

pub use prompt::{ContentPrompt, build_content_prompt, build_image_prompt};
pub use repair::{PostDraft, repair_response};
