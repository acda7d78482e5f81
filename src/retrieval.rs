use std::sync::{Arc, OnceLock};

use crate::{
    backend::EmbeddingBackend,
    data_dir::DataDir,
    error::{Error, Result},
    tag_index::{TagIndex, l2_normalize},
};

/// Candidates retrieved per query, before oracle filtering.
pub const TOP_K: usize = 8;

/// A retrieved tag with its inner-product similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub tag: String,
    pub score: f32,
}

/// The persisted artifacts loaded into memory: the index and its positionally
/// aligned tag list. Immutable after load.
#[derive(Debug)]
struct LoadedIndex {
    index: TagIndex,
    tags: Vec<String>,
}

impl LoadedIndex {
    fn load(data_dir: &DataDir) -> Result<Self> {
        let index_file = data_dir.index_file();
        let tag_list_file = data_dir.tag_list_file();
        if !index_file.exists() || !tag_list_file.exists() {
            return Err(Error::Config(format!(
                "index artifacts missing under {}; run `inktag build` first",
                data_dir.root().display()
            )));
        }

        let index = TagIndex::read_from(&index_file)?;
        let tags: Vec<String> =
            serde_json::from_slice(&std::fs::read(&tag_list_file)?)
                .map_err(|e| {
                    Error::Config(format!(
                        "malformed tag list {}: {e}",
                        tag_list_file.display()
                    ))
                })?;

        if tags.len() != index.len() {
            return Err(Error::Config(format!(
                "index holds {} vectors but tag list has {} entries",
                index.len(),
                tags.len()
            )));
        }

        Ok(Self { index, tags })
    }
}

/// Process-wide cache for the loaded artifacts.
///
/// The hosting runtime may keep a process warm across invocations; the first
/// retrieval pays the load cost and every later one reuses the cached handle.
/// There is no writer after initialization, so a shared immutable handle is
/// all the synchronization required.
#[derive(Debug, Default)]
pub struct IndexCache {
    inner: OnceLock<Arc<LoadedIndex>>,
}

impl IndexCache {
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    fn get_or_load(&self, data_dir: &DataDir) -> Result<Arc<LoadedIndex>> {
        if let Some(loaded) = self.inner.get() {
            return Ok(loaded.clone());
        }
        let loaded = Arc::new(LoadedIndex::load(data_dir)?);
        // Concurrent first uses may both load; whichever stores first wins
        // and every caller sees that same handle from then on.
        Ok(self.inner.get_or_init(|| loaded).clone())
    }
}

/// The online retrieval engine: embeds a description and returns the most
/// similar vocabulary tags.
#[derive(Debug)]
pub struct Retriever {
    loaded: Arc<LoadedIndex>,
}

impl Retriever {
    /// Open the engine against the cached artifacts, loading them on first
    /// use. Missing artifacts are a fatal configuration error, not retried.
    pub fn open(cache: &IndexCache, data_dir: &DataDir) -> Result<Self> {
        Ok(Self {
            loaded: cache.get_or_load(data_dir)?,
        })
    }

    /// Retrieve up to `k` candidate tags for a free-text description, most
    /// similar first.
    ///
    /// The description is embedded with the same backend and model as the
    /// build path and normalized identically, so the index's inner-product
    /// scores are cosine similarities.
    pub fn retrieve(
        &self,
        backend: &dyn EmbeddingBackend,
        description: &str,
        k: usize,
    ) -> Result<Vec<Candidate>> {
        let mut vectors =
            backend.embed_batch(&[description.to_string()])?;
        let mut query = vectors.pop().ok_or_else(|| {
            Error::Backend(
                "embedding backend returned no vector for the query".into(),
            )
        })?;
        l2_normalize(&mut query);

        let candidates = self
            .loaded
            .index
            .search(&query, k)
            .into_iter()
            .map(|hit| Candidate {
                tag: self.loaded.tags[hit.position].clone(),
                score: hit.score,
            })
            .collect();

        Ok(candidates)
    }

    pub fn tag_count(&self) -> usize {
        self.loaded.tags.len()
    }

    pub fn dimension(&self) -> usize {
        self.loaded.index.dimension()
    }
}
