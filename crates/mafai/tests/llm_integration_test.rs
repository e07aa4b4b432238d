//! Live narration against real LLM providers.

use mafai::{LlmClient, LlmConfig, LlmNarrator, LlmProvider, Narrator};
use mafai_game::{IntroSummary, NightSummary};
use tracing::instrument;

fn narrator(provider: LlmProvider) -> LlmNarrator {
    dotenvy::dotenv().ok();

    let var = provider.api_key_var();
    let api_key = std::env::var(var).unwrap_or_else(|_| panic!("{} not set", var));

    LlmNarrator::new(LlmClient::new(LlmConfig::new(
        provider,
        api_key,
        provider.default_model().to_string(),
        200,
    )))
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_intro() {
    let summary = IntroSummary {
        theme: Some("A lighthouse in a storm".to_string()),
        players: vec!["Ada".into(), "Bo".into(), "Cy".into(), "Di".into()],
    };
    let text = narrator(LlmProvider::OpenAI)
        .narrate_intro(&summary)
        .await
        .expect("Failed to narrate");
    assert!(!text.is_empty(), "Narration should not be empty");
    eprintln!("Intro: {}", text);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_night() {
    let summary = NightSummary {
        round: 1,
        theme: None,
        activities: vec![],
        deaths: vec!["Bo".into()],
        saved: None,
    };
    let text = narrator(LlmProvider::Anthropic)
        .narrate_night(&summary)
        .await
        .expect("Failed to narrate");
    assert!(!text.is_empty(), "Narration should not be empty");
    eprintln!("Night: {}", text);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_night() {
    let summary = NightSummary {
        round: 2,
        theme: Some("A desert caravan".to_string()),
        activities: vec![],
        deaths: vec![],
        saved: Some("Cy".into()),
    };
    let text = narrator(LlmProvider::Gemini)
        .narrate_night(&summary)
        .await
        .expect("Failed to narrate");
    assert!(!text.is_empty(), "Narration should not be empty");
    eprintln!("Night: {}", text);
}
