//! System prompt and sampling parameter selection per mode.

use std::fmt::Write as _;

use crate::config::{GenerationDefaults, PromptConfig};
use crate::discussion::conclusion::REQUIRED_SECTIONS;
use crate::llm::GenerationParams;

/// What the model is asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Open-ended discussion guidance.
    Facilitate,
    /// Fixed-structure meeting conclusion.
    Conclude,
}

/// System prompt plus the parameters to send with it.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedPrompt {
    /// Full system prompt text.
    pub system_prompt: String,
    /// Sampling parameters for this mode.
    pub params: GenerationParams,
}

/// Trim and HTML-escape user-supplied text before it enters a prompt.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let trimmed = text.trim();
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Builds mode-specific prompts from a configured model and defaults.
#[derive(Clone, Debug)]
pub struct PromptComposer {
    model: String,
    config: PromptConfig,
}

impl PromptComposer {
    /// Create a composer for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, config: PromptConfig) -> Self {
        Self {
            model: model.into(),
            config,
        }
    }

    /// Model identifier used for every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Compose the prompt for `mode` about `topic`.
    ///
    /// `topic` and `focus_areas` are sanitized here; callers pass raw input.
    #[must_use]
    pub fn compose(&self, mode: Mode, topic: &str, focus_areas: Option<&[String]>) -> ComposedPrompt {
        let topic = sanitize(topic);
        match mode {
            Mode::Facilitate => ComposedPrompt {
                system_prompt: facilitation_prompt(&topic),
                params: self.params(&self.config.facilitate),
            },
            Mode::Conclude => ComposedPrompt {
                system_prompt: conclusion_prompt(&topic, focus_areas),
                params: self.params(&self.config.conclude),
            },
        }
    }

    fn params(&self, defaults: &GenerationDefaults) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            top_p: defaults.top_p,
            frequency_penalty: defaults.frequency_penalty,
            presence_penalty: defaults.presence_penalty,
        }
    }
}

fn facilitation_prompt(topic: &str) -> String {
    format!(
        "You are an AI discussion facilitator. Current topic: {topic}

Your role:
- Ask probing questions to deepen understanding
- Identify common ground between participants
- Challenge assumptions constructively
- Ensure balanced participation and invite quieter voices
- Keep the discussion focused and productive

Respond naturally using markdown when helpful. Keep replies concise (1-2 paragraphs) and engaging."
    )
}

/// Minimum bullets and guidance per required section, in output order.
const SECTION_GUIDANCE: [(usize, &str); 4] = [
    (3, "the main discussion outcomes, focused on concrete results"),
    (2, "notable observations, unexpected findings or participant breakthroughs"),
    (1, "points the participants explicitly agreed on"),
    (2, "clear next steps, each with an owner and a timeframe where possible"),
];

fn conclusion_prompt(topic: &str, focus_areas: Option<&[String]>) -> String {
    let mut prompt = format!(
        "Generate a comprehensive conclusion for the discussion: {topic}

Output format is mandatory. Produce exactly four sections, in this order, each introduced by a markdown level-2 header written exactly as shown. Under each header write only bullet points starting with \"- \".
"
    );

    for (name, (min_bullets, guidance)) in REQUIRED_SECTIONS.iter().zip(SECTION_GUIDANCE) {
        let _ = write!(prompt, "\n## {name}\n- at least {min_bullets} bullet(s): {guidance}\n");
    }

    if let Some(areas) = focus_areas.filter(|a| !a.is_empty()) {
        prompt.push_str("\nGive particular attention to these focus areas:\n");
        for area in areas {
            let _ = writeln!(prompt, "- {}", sanitize(area));
        }
    }

    prompt.push_str(
        "\nDo not rename, merge, reorder or omit any header. Do not add other headers. Maintain a professional tone.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> PromptComposer {
        PromptComposer::new("test/model", PromptConfig::default())
    }

    #[test]
    fn test_sanitize_escapes_markup() {
        let cleaned = sanitize("  <script>x</script>  ");
        assert_eq!(cleaned, "&lt;script&gt;x&lt;/script&gt;");
        assert_eq!(sanitize("Tom & \"Jerry's\""), "Tom &amp; &#34;Jerry&#39;s&#34;");
    }

    #[test]
    fn test_title_markup_never_reaches_prompt() {
        for mode in [Mode::Facilitate, Mode::Conclude] {
            let composed = composer().compose(mode, "<script>x</script>", None);
            assert!(composed.system_prompt.contains("&lt;script&gt;x&lt;/script&gt;"));
            assert!(!composed.system_prompt.contains('<'));
            assert!(!composed.system_prompt.contains('>'));
        }
    }

    #[test]
    fn test_facilitation_prompt_and_params() {
        let composed = composer().compose(Mode::Facilitate, "Remote work", None);
        assert!(composed.system_prompt.contains("Current topic: Remote work"));
        assert!(composed.system_prompt.contains("probing questions"));
        assert!(composed.system_prompt.contains("common ground"));
        assert!(composed.system_prompt.contains("Challenge assumptions"));
        assert!(composed.system_prompt.contains("balanced participation"));
        assert_eq!(composed.params.model, "test/model");
        assert!((composed.params.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(composed.params.max_tokens, 1000);
    }

    #[test]
    fn test_conclusion_prompt_lists_sections_in_order() {
        let composed = composer().compose(Mode::Conclude, "Budget", None);
        let prompt = &composed.system_prompt;

        let positions: Vec<usize> = REQUIRED_SECTIONS
            .iter()
            .filter_map(|name| prompt.find(&format!("## {name}\n")))
            .collect();
        assert_eq!(positions.len(), 4);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("at least 3 bullet(s)"));
    }

    #[test]
    fn test_conclusion_params_are_tighter() {
        let composer = composer();
        let chat = composer.compose(Mode::Facilitate, "t", None).params;
        let conclude = composer.compose(Mode::Conclude, "t", None).params;
        assert!(conclude.temperature < chat.temperature);
        assert!(conclude.max_tokens > chat.max_tokens);
    }

    #[test]
    fn test_focus_areas_are_sanitized() {
        let areas = vec!["cost".to_string(), "<b>risk</b>".to_string()];
        let composed = composer().compose(Mode::Conclude, "Budget", Some(&areas));
        assert!(composed.system_prompt.contains("- cost\n"));
        assert!(composed.system_prompt.contains("- &lt;b&gt;risk&lt;/b&gt;\n"));
    }
}
