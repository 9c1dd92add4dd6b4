//! Retrieval-Augmented Generation pipeline for grounding chat answers in
//! PDF document collections.
//!
//! The crate covers the full ingest-and-query workflow:
//!
//! - **Ingestion** ([`IngestPipeline`]): extract text from PDFs, split into
//!   passages with lineage metadata, embed, and upsert into a vector store.
//! - **Query** ([`QueryPipeline`]): embed the question, retrieve the most
//!   relevant passages, render them into a grounding context, and generate
//!   an answer with citations.
//!
//! Providers are polymorphic: [`EmbeddingProvider`] and
//! [`GenerationProvider`] each have on-device and hosted backends selected
//! by configuration, and [`VectorStore`] has in-memory and Qdrant backends.
//! Optional backends live behind cargo features (`hf`, `gemini`, `qdrant`,
//! `pdf`, `local-embedding`).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragdoc::{
//!     DiagnosticLog, IngestPipeline, InMemoryVectorStore, QueryPipeline, RagConfig,
//!     Retriever, SentenceSplitter,
//! };
//!
//! let config = RagConfig::default();
//! let store = Arc::new(InMemoryVectorStore::new());
//! let log = DiagnosticLog::new();
//!
//! let ingest = IngestPipeline::builder()
//!     .config(config.clone())
//!     .extractor(extractor)
//!     .splitter(Arc::new(SentenceSplitter::new()))
//!     .embedder(embedder.clone())
//!     .store(store.clone())
//!     .log(log.clone())
//!     .build()?;
//! ingest.ingest(pdf_dir).await?;
//!
//! let retriever = Retriever::new(embedder, store, &config.collection);
//! let query = QueryPipeline::new(retriever, generator, config.top_k, log);
//! let answer = query.answer("what is X?", "markdown").await?;
//! ```

pub mod config;
pub mod diag;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod inmemory;
pub mod local;
pub mod query;
pub mod retriever;
pub mod retry;
pub mod splitter;
pub mod vectorstore;

#[cfg(feature = "local-embedding")]
pub mod candle;
#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "hf")]
pub mod hf;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use config::{RagConfig, RagConfigBuilder};
pub use diag::{DiagEntry, DiagLevel, DiagnosticLog};
pub use document::{Document, Metadata, Payload, SearchResult, VectorRecord};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{ExtractedText, TextExtractor};
pub use generation::{GenerationProvider, PromptTemplate};
pub use ingest::{IngestPipeline, IngestPipelineBuilder, IngestReport};
pub use inmemory::InMemoryVectorStore;
pub use local::{EngineLoader, LocalEngine, LocalGenerationProvider};
pub use query::{ChatAnswer, QueryPipeline, SourceRef};
pub use retriever::{format_context, Retriever};
pub use retry::{RetryExhausted, RetryPolicy};
pub use splitter::{RecursiveCharacterSplitter, SentenceSplitter, Splitter};
pub use vectorstore::{DistanceMetric, VectorStore};

#[cfg(feature = "local-embedding")]
pub use candle::CandleEmbeddingProvider;
#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiGenerationProvider};
#[cfg(feature = "hf")]
pub use hf::{HfEmbeddingProvider, HfGenerationProvider};
#[cfg(feature = "pdf")]
pub use extract::PdfTextExtractor;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
