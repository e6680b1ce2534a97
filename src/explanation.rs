/// Prompt construction and the text-generation seam used by the fetcher.

use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const PLACEHOLDER_TEXT: &str = "Drag the slider to explore...";
pub const FALLBACK_ERROR_TEXT: &str = "An error occurred retrieving the explanation";
pub const FALLBACK_EMPTY_TEXT: &str = "No explanation available";

#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Anything that can turn a prompt into generated text.
pub trait TextGenerator: Send + Sync + 'static {
    fn generate(&self, prompt: String) -> impl Future<Output = Result<String, ExplanationError>> + Send;
}

pub fn build_prompt(temperature: f64, language: &str) -> String {
    format!(
        "The temperature is currently {temperature}°C in a water density simulator.\n\
         Based on the text: \"When a substance is heated its volume grows... Water does not \
         behave like other substances... at 4 degrees Celsius the volume is smallest.\"\n\
         Give a short, engaging and educational explanation (at most 3 sentences) of what \
         happens to the water molecules at exactly this temperature compared with other \
         liquids. Answer in {language}."
    )
}

static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__|[*`#]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Strips markdown emphasis and collapses whitespace in generated text.
pub fn clean_explanation(raw: &str) -> String {
    let plain = EMPHASIS.replace_all(raw, "");
    WHITESPACE.replace_all(plain.trim(), " ").into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_temperature_and_language() {
        let prompt = build_prompt(12.5, "Swedish");
        assert!(prompt.contains("12.5°C"));
        assert!(prompt.contains("at most 3 sentences"));
        assert!(prompt.ends_with("Answer in Swedish."));
        assert!(build_prompt(-3.0, "English").contains("-3°C"));
    }

    #[test]
    fn test_clean_explanation() {
        assert_eq!(
            clean_explanation("  **Water** is  densest\n\nat *4°C*. "),
            "Water is densest at 4°C."
        );
        assert_eq!(clean_explanation(" \n\t "), "");
    }
}
