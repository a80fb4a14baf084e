//! Prompt templates, one per level.
//!
//! Only the topic is substituted; the level picks a fixed system prompt.

use crate::types::{Level, Message};

/// Ceiling on generated tokens per explanation.
pub const MAX_OUTPUT_TOKENS: u32 = 1500;

const FORMAT_HINT: &str = "Structure the answer with ### for main sections and #### for subsections, \
numbered lists for sequential steps and bullet points (-) for key ideas.";

pub fn system_prompt(level: Level) -> String {
    let audience = match level {
        Level::Eli5 => {
            "Explain the concept as if to a five-year-old. Use simple words, playful \
             analogies and short sentences, and keep it fun."
        }
        Level::Student => {
            "Explain the concept at a high school or early university level. Use clear \
             examples and everyday analogies, and avoid unexplained jargon."
        }
        Level::Graduate => {
            "Explain the concept at a graduate level. Cover the theoretical background, \
             technical details and academic context, using the correct terminology."
        }
        Level::Advanced => {
            "Explain the concept at an expert level. Include current research, the harder \
             theory and professional applications, and be technically precise."
        }
    };
    format!("{audience} {FORMAT_HINT}")
}

pub fn user_prompt(topic: &str) -> String {
    format!("Please explain: {}", topic)
}

/// System + user messages for one explanation request.
pub fn build_messages(topic: &str, level: Level) -> Vec<Message> {
    vec![Message::system(system_prompt(level)), Message::user(user_prompt(topic))]
}
