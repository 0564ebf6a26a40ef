use std::env;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::config::{ClassifierConfig, ProviderKind};
use crate::providers::ollama::OllamaProvider;
use crate::providers::openai::OpenAIProvider;

/// Trait representing a hosted LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Send a prompt to the provider and return the response.
    async fn send_prompt(&self, prompt: &str) -> Result<String>;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }
}

/// Builds the provider named in the config, or `None` when it can't be used.
///
/// OpenAI needs `OPENAI_API_KEY`; Ollama only needs a reachable server, which
/// is discovered on the first call.
pub fn hosted_provider(config: &ClassifierConfig, brand: &str) -> Option<Box<dyn LLMProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let built: Result<Box<dyn LLMProvider>> = match config.provider {
        ProviderKind::Disabled => return None,
        ProviderKind::OpenAI => {
            if env::var("OPENAI_API_KEY").map_or(true, |k| k.trim().is_empty()) {
                return None;
            }
            OpenAIProvider::new(config.model.clone(), Some(config.temperature), timeout)
                .map(|p| {
                    let p = match &config.base_url {
                        Some(url) => p.with_base_url(url.clone()),
                        None => p,
                    };
                    Box::new(p) as Box<dyn LLMProvider>
                })
        }
        ProviderKind::Ollama => OllamaProvider::new(
            config.model.clone(),
            Some(config.temperature),
            config.base_url.clone(),
            timeout,
        )
        .map(|p| Box::new(p.with_brand(brand)) as Box<dyn LLMProvider>),
    };

    match built {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!("Hosted classifier unavailable: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_is_none() {
        let config = ClassifierConfig {
            provider: ProviderKind::Disabled,
            ..ClassifierConfig::default()
        };
        assert!(hosted_provider(&config, "SteamNoodles").is_none());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = ClassifierConfig {
            provider: ProviderKind::Ollama,
            ..ClassifierConfig::default()
        };
        let provider = hosted_provider(&config, "SteamNoodles").unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model_name(), "qwen3:8b");
    }
}
