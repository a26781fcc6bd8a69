mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use parking_lot::Mutex;
use pdf_rag_core::{
    discover_pdf_files, AnswerGenerator, CharacterNgramEmbedder, Embedder, OllamaConfig,
    OllamaEmbedder, OllamaGenerator, RagCoordinator, RagOptions,
};
use server::{AppState, Engine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding backend
    #[arg(long, value_enum, env = "PDF_RAG_EMBEDDER", default_value_t = EmbedderKind::Ollama)]
    embedder: EmbedderKind,

    /// Ollama-compatible model server base URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model name
    #[arg(long, env = "PDF_RAG_EMBED_MODEL", default_value = "all-minilm")]
    embed_model: String,

    /// Width of the vectors the embedding backend produces
    #[arg(long, env = "PDF_RAG_EMBEDDING_DIMENSIONS", default_value = "384")]
    embedding_dimensions: usize,

    /// Generation model name
    #[arg(long, env = "PDF_RAG_GENERATE_MODEL", default_value = "llama3.2")]
    generate_model: String,

    /// Per-request model timeout in seconds, 0 disables it
    #[arg(long, env = "PDF_RAG_MODEL_TIMEOUT_SECS", default_value = "120")]
    model_timeout_secs: u64,

    /// Chunk window size in characters
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "200")]
    chunk_overlap: usize,

    /// Number of chunks used as context
    #[arg(long, default_value = "3")]
    top_k: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Local hashed character trigrams, no model server needed.
    Ngram,
    /// Embeddings endpoint of the Ollama server.
    Ollama,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload/query HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "PDF_RAG_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
        /// Largest accepted upload in bytes.
        #[arg(long, default_value = "52428800")]
        max_upload_bytes: usize,
    },
    /// Load PDFs and answer one question.
    Ask {
        /// PDF file or folder searched recursively. Repeatable.
        #[arg(long = "pdf", required = true)]
        pdfs: Vec<PathBuf>,
        /// Question to answer.
        #[arg(long)]
        question: String,
    },
}

impl Cli {
    fn rag_options(&self) -> RagOptions {
        RagOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
            ..RagOptions::default()
        }
    }

    fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            embed_model: self.embed_model.clone(),
            generate_model: self.generate_model.clone(),
            request_timeout: (self.model_timeout_secs > 0)
                .then(|| Duration::from_secs(self.model_timeout_secs)),
        }
    }

    fn build_engine(&self) -> anyhow::Result<Engine> {
        let ollama = self.ollama_config();
        let embedder: Box<dyn Embedder + Send> = match self.embedder {
            EmbedderKind::Ngram => Box::new(CharacterNgramEmbedder {
                dimensions: self.embedding_dimensions,
            }),
            EmbedderKind::Ollama => Box::new(
                OllamaEmbedder::new(&ollama, self.embedding_dimensions)
                    .context("failed to configure embedding backend")?,
            ),
        };
        let generator: Box<dyn AnswerGenerator + Send> = Box::new(
            OllamaGenerator::new(&ollama).context("failed to configure generation backend")?,
        );

        RagCoordinator::new(embedder, generator, self.rag_options())
            .context("invalid retrieval options")
    }
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut engine = cli.build_engine()?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        embedder = ?cli.embedder,
        chunk_size = engine.options().chunk_size,
        chunk_overlap = engine.options().chunk_overlap,
        top_k = engine.options().top_k,
        "pdf-rag boot"
    );

    match &cli.command {
        Command::Serve {
            bind,
            max_upload_bytes,
        } => {
            let engine = Arc::new(Mutex::new(engine));
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(server::serve(
                *bind,
                AppState::new(Arc::clone(&engine)),
                *max_upload_bytes,
            ))?;
            // The engine owns blocking HTTP clients, which must not be
            // dropped from inside the runtime.
            drop(runtime);
            drop(engine);
        }
        Command::Ask { pdfs, question } => {
            for path in expand_pdf_paths(pdfs) {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("upload.pdf");

                match engine.ingest_pdf(name, &bytes) {
                    Ok(document) => info!(
                        path = %path.display(),
                        chunks = document.chunk_count,
                        "loaded pdf"
                    ),
                    Err(error) => warn!(path = %path.display(), reason = %error, "skipped pdf"),
                }
            }

            let result = engine.query(question)?;
            println!("answer: {}", result.answer);
            for source in result.sources {
                println!("[page {}] {}", source.page, source.excerpt);
            }
        }
    }

    Ok(())
}

fn expand_pdf_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| {
            if path.is_dir() {
                discover_pdf_files(path)
            } else {
                vec![path.to_path_buf()]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_reference_tunables() {
        let cli = Cli::parse_from(["pdf-rag", "ask", "--pdf", "a.pdf", "--question", "why?"]);
        let options = cli.rag_options();

        assert_eq!(options.chunk_size, 1000);
        assert_eq!(options.chunk_overlap, 200);
        assert_eq!(options.top_k, 3);
        assert_eq!(options.max_answer_length, 512);
        assert_eq!(
            cli.ollama_config().request_timeout,
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cli = Cli::parse_from([
            "pdf-rag",
            "--model-timeout-secs",
            "0",
            "serve",
        ]);
        assert_eq!(cli.ollama_config().request_timeout, None);
    }

    #[test]
    fn overlapping_chunks_are_refused() {
        let cli = Cli::parse_from([
            "pdf-rag",
            "--embedder",
            "ngram",
            "--chunk-size",
            "100",
            "--chunk-overlap",
            "100",
            "serve",
        ]);
        assert!(cli.build_engine().is_err());
    }

    #[test]
    fn engine_carries_cli_tunables() -> anyhow::Result<()> {
        let cli = Cli::parse_from([
            "pdf-rag",
            "--embedder",
            "ngram",
            "--chunk-size",
            "400",
            "--chunk-overlap",
            "50",
            "--top-k",
            "5",
            "serve",
        ]);
        let engine = cli.build_engine()?;

        assert_eq!(engine.options().chunk_size, 400);
        assert_eq!(engine.options().chunk_overlap, 50);
        assert_eq!(engine.options().top_k, 5);
        assert!(!engine.has_documents());
        Ok(())
    }

    #[test]
    fn folders_expand_to_their_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("nested"))?;
        std::fs::write(dir.path().join("nested").join("a.pdf"), b"%PDF-1.4")?;
        std::fs::write(dir.path().join("skip.txt"), b"text")?;

        let single = PathBuf::from("single.pdf");
        let expanded = expand_pdf_paths(&[dir.path().to_path_buf(), single.clone()]);

        assert_eq!(
            expanded,
            vec![dir.path().join("nested").join("a.pdf"), single]
        );
        Ok(())
    }
}
