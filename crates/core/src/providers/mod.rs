pub mod ollama;

pub use ollama::{OllamaConfig, OllamaEmbedder, OllamaGenerator};
