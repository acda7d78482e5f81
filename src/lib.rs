//! inktag - embedding-based auto-tagging for body modification imagery.
//!
//! An offline builder embeds a controlled tag vocabulary and persists a
//! normalized inner-product index; the online pipeline describes an uploaded
//! image with a vision model, retrieves the nearest vocabulary tags, filters
//! them through a chat-model oracle, and writes the survivors to the
//! document store.
//!
//! # Quick start
//!
//! ```no_run
//! use inktag::{DataDir, IndexCache, OpenAiClient, Retriever};
//! use inktag::retrieval::TOP_K;
//!
//! static CACHE: IndexCache = IndexCache::new();
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let client = OpenAiClient::from_env().unwrap();
//!
//! let retriever = Retriever::open(&CACHE, &data_dir).unwrap();
//! let candidates = retriever
//!     .retrieve(&client, "minimalist line tattoo on forearm", TOP_K)
//!     .unwrap();
//! for c in &candidates {
//!     println!("{} (score: {:.3})", c.tag, c.score);
//! }
//! ```

pub mod backend;
pub mod builder;
pub mod cli;
pub mod data_dir;
pub mod describe;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod retrieval;
pub mod tag_index;
pub mod vocabulary;

pub use backend::{ChatBackend, EmbeddingBackend, OpenAiClient};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use pipeline::{AutoTagger, DocumentStore, ObjectStore, UploadEvent};
pub use retrieval::{Candidate, IndexCache, Retriever};
pub use tag_index::TagIndex;
