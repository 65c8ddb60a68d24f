use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::TransportError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaVersionResponse {
    #[serde(default)]
    version: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    list_timeout: Duration,
    chat_timeout: Duration,
}

impl OllamaClient {
    pub fn new(settings: &Settings) -> Self {
        // Proxies from the environment should not intercept a local server
        let client = if is_loopback(&settings.base_url) {
            Client::builder().no_proxy().build().unwrap_or_else(|_| Client::new())
        } else {
            Client::new()
        };

        Self {
            client,
            base_url: settings.base_url.clone(),
            list_timeout: settings.list_timeout,
            chat_timeout: settings.chat_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the locally installed models, in server order.
    pub async fn list_models(&self) -> Result<Vec<String>, TransportError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.get(&url, self.list_timeout).await?;
        let models_response: OllamaModelsResponse =
            read_json(response, self.list_timeout).await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        debug!(count = model_names.len(), "listed models");
        Ok(model_names)
    }

    /// Reachability probe. Any 200 body counts; the version string is best effort.
    pub async fn check_version(&self) -> Result<String, TransportError> {
        let url = format!("{}/api/version", self.base_url);

        let response = self.get(&url, self.list_timeout).await?;
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.list_timeout.as_secs()))?;

        Ok(serde_json::from_str::<OllamaVersionResponse>(&body)
            .map(|v| v.version)
            .unwrap_or_default())
    }

    /// Single-turn, non-streaming chat completion.
    pub async fn chat(&self, model: &str, user_text: &str) -> Result<String, TransportError> {
        let url = format!("{}/api/chat", self.base_url);
        let secs = self.chat_timeout.as_secs();

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: user_text,
            }],
            stream: false,
        };

        debug!(model, chars = user_text.chars().count(), "sending chat request");

        // `.json()` also sets `Content-Type: application/json`
        let response = self
            .client
            .post(&url)
            .timeout(self.chat_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, secs))?;

        let response = check_status(response, secs).await?;
        let chat_response: ChatResponse = read_json(response, self.chat_timeout).await?;
        Ok(chat_response.message.content)
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<Response, TransportError> {
        let secs = timeout.as_secs();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, secs))?;

        check_status(response, secs).await
    }
}

fn is_loopback(base_url: &str) -> bool {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .map(|host| matches!(
                host.as_str(),
                "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]" | "::1"
            ))
        .unwrap_or(false)
}

async fn check_status(response: Response, secs: u64) -> Result<Response, TransportError> {
    // Anything but 200 is an error, other 2xx codes included
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::from_reqwest(e, secs))?;
    warn!(%url, status = status.as_u16(), "ollama returned an error status");

    Err(TransportError::Protocol {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, TransportError> {
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::from_reqwest(e, timeout.as_secs()))?;
    Ok(serde_json::from_str(&body)?)
}
