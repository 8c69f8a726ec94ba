//! Instruction prompt templating with `{{placeholder}}` substitution.
//!
//! The template is plain text; every `{{ key }}` is replaced with the
//! matching entry from an `inputs` object. `PromptBuilder::render` derives
//! those inputs from a `GenerationConfig`.
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::model::GenerationConfig;

pub const DEFAULT_TEMPLATE: &str = "\
You are a social media strategist. Study the attached photo and write a ready-to-post social kit.
Tone of voice: {{tone}}.
Target platforms: {{platforms}}.
Emoji: {{emoji}}.
Write everything in {{language}}.
Respond with a single JSON object with these keys:
- \"captions\": an object mapping each platform to an array of 3 caption options,
- \"hashtags\": an object mapping each platform to an array of relevant hashtags,
- \"scripts\": an object mapping each platform that supports video to a short video script.";

pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        PromptBuilder::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        PromptBuilder { template: DEFAULT_TEMPLATE.to_string() }
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        PromptBuilder { template: template.into() }
    }

    /// Render the instruction text for one generation call.
    pub fn render(&self, config: &GenerationConfig) -> AppResult<String> {
        let emoji = if config.include_emoji {
            "use emoji where they fit naturally"
        } else {
            "do not use any emoji"
        };
        let inputs = json!({
            "tone": config.tone.as_str(),
            "platforms": config.platforms.join(", "),
            "emoji": emoji,
            "language": config.language,
        });
        render_template(&self.template, &inputs)
    }
}

/// Replace every `{{key}}` in `template` with `inputs[key]`.
///
/// String inputs are inserted verbatim, other JSON values in their compact form.
pub fn render_template(template: &str, inputs: &Value) -> AppResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            AppError::PromptConstruction("Unterminated placeholder in template".to_string())
        })?;
        let key = after[..end].trim();
        match inputs.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => {
                return Err(AppError::PromptConstruction(format!(
                    "Missing input for placeholder: {}",
                    key
                )))
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
