use async_trait::async_trait;

use crate::{
    adapters::{Translator, api_key_from_env},
    error::{Result, SpeechmarkError},
};

/// Chat-completion backends reachable through the OpenAI-compatible API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

/// Where and how a translation request is sent. Starts from the provider's
/// defaults; model and URL can be overridden per translator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub api_url: String,
    pub model: String,
    pub env_var: &'static str,
}

impl Provider {
    pub fn endpoint(&self) -> Endpoint {
        let (api_url, model, env_var) = match self {
            Provider::Grok => (
                "https://api.x.ai/v1/chat/completions",
                "grok-4-fast",
                "XAI_API_KEY",
            ),
            Provider::Openai => (
                "https://api.openai.com/v1/chat/completions",
                "gpt-4.1-mini",
                "OPENAI_API_KEY",
            ),
            Provider::Gemini => (
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "gemini-2.5-flash",
                "GEMINI_API_KEY",
            ),
        };
        Endpoint {
            api_url: api_url.to_string(),
            model: model.to_string(),
            env_var,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Grok => "Grok",
            Provider::Openai => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }
}

/// Translates narration through a chat model, leaving bookmark tags in place
/// so translated text can go straight back into the pipeline.
pub struct ChatTranslator {
    provider: Provider,
    endpoint: Endpoint,
    api_key: String,
    client: reqwest::Client,
}

impl ChatTranslator {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: provider.endpoint(),
            provider,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Read the API key from the provider's environment variable
    pub fn from_env(provider: Provider) -> Result<Self> {
        let api_key = api_key_from_env(provider.endpoint().env_var)?;
        Ok(Self::new(provider, api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.endpoint.model = model.into();
        self
    }

    /// Send requests to another OpenAI-compatible chat-completions URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.endpoint.api_url = api_url.into();
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

fn system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a translator for video narration scripts.

Translate the user's text from {source_language} to {target_language}.

Rules:
- Keep every XML-like tag, such as <bookmark mark='name'/>, exactly as written and at the matching position in the translated sentence
- Do not add notes, quotes or explanations
- Output ONLY the translated text"#
    )
}

fn extract_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| SpeechmarkError::Translation {
            reason: format!("Invalid API response: {:?}", response),
        })
}

#[async_trait]
impl Translator for ChatTranslator {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        tracing::info!(
            provider = self.provider.name(),
            model = %self.endpoint.model,
            from = source_language,
            to = target_language,
            "translating"
        );

        let response = self
            .client
            .post(&self.endpoint.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.endpoint.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt(source_language, target_language),
                    },
                    {
                        "role": "user",
                        "content": text,
                    },
                ],
                "temperature": 0.0,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechmarkError::Translation {
                reason: format!("{status}: {body}"),
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        extract_content(&response)
    }
}
