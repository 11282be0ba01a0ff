//! Executive narrative generation
//!
//! Turns a [`VarianceSummary`] into CFO-facing commentary by rendering the
//! `executive_narrative` prompt and handing it to an injected text backend.

use std::collections::HashMap;

use tracing::info;

use crate::ai::{AIBackend, AIClient, CompletionRequest};
use crate::config::NarrativeConfig;
use crate::error::{Error, Result};
use crate::models::{ExecutiveNarrative, VarianceSummary};
use crate::prompts::{Prompt, PromptId, PromptLibrary};

/// Generates executive narratives with an explicitly supplied backend
pub struct NarrativeGenerator<B = AIClient> {
    backend: B,
    prompt: Prompt,
    settings: NarrativeConfig,
}

impl<B: AIBackend> NarrativeGenerator<B> {
    /// Resolve the narrative prompt once and keep the backend for later calls
    pub fn new(backend: B, prompts: &mut PromptLibrary) -> Result<Self> {
        let prompt = prompts.get(PromptId::ExecutiveNarrative)?.clone();
        Ok(Self {
            backend,
            prompt,
            settings: NarrativeConfig::default(),
        })
    }

    /// Use token and temperature settings from config
    pub fn with_settings(mut self, settings: NarrativeConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the completion request for a summary without sending it
    pub fn build_request(&self, summary: &VarianceSummary) -> CompletionRequest {
        let vars = summary_vars(summary);
        let mut request = CompletionRequest::new(self.prompt.render_user(&vars))
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature);
        if let Some(system) = self.prompt.system_section() {
            request = request.with_system(system);
        }
        request
    }

    /// Ask the backend for a narrative
    ///
    /// Backend failures propagate unchanged. A blank reply is an error so a
    /// run never records an empty narrative.
    pub async fn generate(&self, summary: &VarianceSummary) -> Result<ExecutiveNarrative> {
        let request = self.build_request(summary);
        let text = self.backend.complete(&request).await?;
        let text = text.trim();

        if text.is_empty() {
            return Err(Error::Narrative(format!(
                "{} returned an empty narrative",
                self.backend.model()
            )));
        }

        info!(
            model = self.backend.model(),
            chars = text.len(),
            "Generated executive narrative"
        );

        Ok(ExecutiveNarrative {
            executive_narrative: text.to_string(),
        })
    }
}

/// Prompt variables: the five summary fields, amounts to two decimals
fn summary_vars(summary: &VarianceSummary) -> HashMap<&'static str, String> {
    HashMap::from([
        ("revenue_change", format!("{:.2}", summary.revenue_change)),
        ("opex_change", format!("{:.2}", summary.opex_change)),
        ("margin_change", format!("{:.2}", summary.margin_change)),
        ("top_region_driver", summary.top_region_driver.clone()),
        ("top_region_delta", format!("{:.2}", summary.top_region_delta)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    fn summary() -> VarianceSummary {
        VarianceSummary {
            revenue_change: 12345.678,
            opex_change: -250.0,
            margin_change: 12595.678,
            top_region_driver: "EMEA".to_string(),
            top_region_delta: 9000.004,
        }
    }

    fn generator(backend: MockBackend) -> NarrativeGenerator<MockBackend> {
        NarrativeGenerator::new(backend, &mut PromptLibrary::embedded_only()).unwrap()
    }

    #[test]
    fn test_request_formats_fields_to_two_decimals() {
        let request = generator(MockBackend::new()).build_request(&summary());

        assert!(request.prompt.contains("Revenue change: 12345.68"));
        assert!(request.prompt.contains("OPEX change: -250.00"));
        assert!(request.prompt.contains("Margin change: 12595.68"));
        assert!(request.prompt.contains("Top region driver: EMEA"));
        assert!(request.prompt.contains("Region delta: 9000.00"));
        assert!(request.system.is_some());
        assert_eq!(request.max_tokens, Some(150));
    }

    #[test]
    fn test_placeholder_like_region_renders_verbatim() {
        let mut summary = summary();
        summary.top_region_driver = "{{revenue_change}}".to_string();
        let generator = generator(MockBackend::new());

        let first = generator.build_request(&summary).prompt;
        assert!(first.contains("Top region driver: {{revenue_change}}"));
        for _ in 0..200 {
            assert_eq!(generator.build_request(&summary).prompt, first);
        }
    }

    #[test]
    fn test_settings_flow_into_request() {
        let generator = generator(MockBackend::new()).with_settings(NarrativeConfig {
            max_tokens: 300,
            temperature: 0.0,
        });
        let request = generator.build_request(&summary());
        assert_eq!(request.max_tokens, Some(300));
        assert_eq!(request.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_generate_returns_trimmed_text() {
        let generator = generator(MockBackend::with_reply("  Revenue rose on EMEA.\n"));
        let narrative = generator.generate(&summary()).await.unwrap();
        assert_eq!(narrative.executive_narrative, "Revenue rose on EMEA.");
    }

    #[tokio::test]
    async fn test_backend_sees_rendered_prompt() {
        let backend = MockBackend::new();
        let generator = generator(backend.clone());
        generator.generate(&summary()).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("Top region driver: EMEA"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let generator = generator(MockBackend::with_reply("   \n"));
        let result = generator.generate(&summary()).await;
        assert!(matches!(result, Err(Error::Narrative(_))));
    }

    #[tokio::test]
    async fn test_works_through_ai_client() {
        let generator =
            NarrativeGenerator::new(AIClient::mock(), &mut PromptLibrary::embedded_only())
                .unwrap();
        let narrative = generator.generate(&summary()).await.unwrap();
        assert!(!narrative.executive_narrative.is_empty());
    }
}
