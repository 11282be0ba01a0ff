//! Narrative command and backend resolution

use anyhow::{bail, Context, Result};

use runway_core::{
    AIBackend, AIClient, CsvStore, ExecutiveNarrative, NarrativeConfig, NarrativeGenerator,
    PromptLibrary,
};

/// Build the text backend from the environment, with an optional model override
pub fn resolve_client(model: Option<&str>) -> Result<AIClient> {
    let client = AIClient::from_env().context(
        "No text-generation backend configured. Set OPENAI_API_KEY, \
         OPENAI_COMPATIBLE_HOST, or AI_BACKEND=ollama with OLLAMA_HOST",
    )?;
    Ok(match model {
        Some(model) => client.with_model(model),
        None => client,
    })
}

/// Fail unless the backend passes its health check
pub async fn ensure_backend(client: &AIClient) -> Result<()> {
    if !client.health_check().await {
        bail!(
            "Text backend at {} is not reachable (model {})",
            client.host(),
            client.model()
        );
    }
    tracing::debug!(host = client.host(), "Text backend healthy");
    Ok(())
}

/// Generate and store a narrative for the stored variance summary
pub async fn cmd_narrate(
    store: &CsvStore,
    settings: &NarrativeConfig,
    client: AIClient,
    json: bool,
) -> Result<ExecutiveNarrative> {
    let summary = store.read_variance_summary().with_context(|| {
        format!(
            "Failed to read variance summary from {} (run `runway variance` first?)",
            store.processed_dir().display()
        )
    })?;

    tracing::debug!(model = client.model(), host = client.host(), "Using text backend");

    let mut prompts = PromptLibrary::new();
    let generator = NarrativeGenerator::new(client, &mut prompts)
        .context("Failed to load narrative prompt")?
        .with_settings(*settings);

    let narrative = generator
        .generate(&summary)
        .await
        .context("Narrative generation failed")?;
    let path = store
        .write_narrative(&narrative)
        .context("Failed to write narrative")?;

    if json {
        let output = serde_json::json!({
            "model": generator.backend().model(),
            "executive_narrative": narrative.executive_narrative,
            "path": path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(narrative);
    }

    println!();
    println!("📝 CFO Narrative ({})", generator.backend().model());
    println!("   ─────────────────────────────────────────────────────────────");
    for line in narrative.executive_narrative.lines() {
        println!("   {}", line);
    }
    println!();
    println!("   Written to {}", path.display());
    println!();

    Ok(narrative)
}
