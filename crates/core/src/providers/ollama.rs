use crate::embeddings::Embedder;
use crate::error::ModelError;
use crate::models::GenerationOptions;
use crate::traits::AnswerGenerator;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "ollama";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embed_model: String,
    pub generate_model: String,
    /// `None` waits for the model server indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm".to_string(),
            generate_model: "llama3.2".to_string(),
            request_timeout: Some(Duration::from_secs(120)),
        }
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, ModelError> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    Ok(base.join(path)?)
}

fn build_client(timeout: Option<Duration>) -> Result<Client, ModelError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn post_json<Req, Resp>(client: &Client, url: &Url, body: &Req) -> Result<Resp, ModelError>
where
    Req: Serialize,
    Resp: for<'de> Deserialize<'de>,
{
    let response = client.post(url.clone()).json(body).send()?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(ModelError::BackendResponse {
            backend: BACKEND.to_string(),
            details: format!("{status}: {text}"),
        });
    }

    response
        .json::<Resp>()
        .map_err(|error| ModelError::Malformed(error.to_string()))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    client: Client,
    url: Url,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// `dimensions` is the width the configured model produces; replies of any
    /// other width are rejected.
    pub fn new(config: &OllamaConfig, dimensions: usize) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            url: endpoint(&config.base_url, "api/embeddings")?,
            model: config.embed_model.clone(),
            dimensions,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let response: EmbeddingResponse = post_json(
            &self.client,
            &self.url,
            &EmbeddingRequest {
                model: &self.model,
                prompt: text,
            },
        )?;

        validate_embedding(response.embedding, self.dimensions)
    }
}

fn validate_embedding(embedding: Vec<f32>, dimensions: usize) -> Result<Vec<f32>, ModelError> {
    if embedding.is_empty() {
        return Err(ModelError::Malformed(
            "embedding response contained no vector".to_string(),
        ));
    }
    if embedding.len() != dimensions {
        return Err(ModelError::DimensionMismatch {
            expected: dimensions,
            actual: embedding.len(),
        });
    }
    Ok(embedding)
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    num_predict: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl From<GenerationOptions> for GenerateParameters {
    fn from(value: GenerationOptions) -> Self {
        Self {
            num_predict: value.max_length,
            temperature: value.deterministic.then_some(0.0),
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct OllamaGenerator {
    client: Client,
    url: Url,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &OllamaConfig) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            url: endpoint(&config.base_url, "api/generate")?,
            model: config.generate_model.clone(),
        })
    }
}

impl AnswerGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String, ModelError> {
        let response: GenerateResponse = post_json(
            &self.client,
            &self.url,
            &GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
                options: options.into(),
            },
        )?;

        response
            .response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ModelError::Malformed("generate response had no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_joins_with_or_without_trailing_slash() {
        let plain = endpoint("http://localhost:11434", "api/generate").unwrap();
        let slashed = endpoint("http://localhost:11434/", "api/generate").unwrap();
        assert_eq!(plain.as_str(), "http://localhost:11434/api/generate");
        assert_eq!(plain, slashed);
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let url = endpoint("http://models.internal/ollama", "api/embeddings").unwrap();
        assert_eq!(url.as_str(), "http://models.internal/ollama/api/embeddings");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        assert!(matches!(
            endpoint("not a url", "api/generate"),
            Err(ModelError::Url(_))
        ));
    }

    #[test]
    fn deterministic_generation_sets_zero_temperature() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Answer:",
            stream: false,
            options: GenerationOptions::default().into(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "prompt": "Answer:",
                "stream": false,
                "options": {"num_predict": 512, "temperature": 0.0},
            })
        );
    }

    #[test]
    fn sampling_generation_leaves_temperature_to_server() {
        let parameters = GenerateParameters::from(GenerationOptions {
            max_length: 64,
            deterministic: false,
        });
        let value = serde_json::to_value(&parameters).unwrap();
        assert_eq!(value, json!({"num_predict": 64}));
    }

    #[test]
    fn empty_embedding_is_malformed() {
        assert!(matches!(
            validate_embedding(Vec::new(), 3),
            Err(ModelError::Malformed(_))
        ));
        assert!(matches!(
            validate_embedding(vec![1.0, 2.0], 3),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(validate_embedding(vec![1.0], 1).unwrap(), vec![1.0]);
    }

    #[test]
    fn generate_response_without_text_is_detected() {
        let parsed: GenerateResponse = serde_json::from_value(json!({"done": true})).unwrap();
        assert!(parsed.response.is_none());
    }
}
