use std::path::Path;

use crate::{
    backend::EmbeddingBackend,
    data_dir::DataDir,
    error::{Error, Result},
    tag_index::{TagIndex, l2_normalize},
    vocabulary::load_vocabulary,
};

/// Summary of a completed index build.
#[derive(Debug)]
pub struct BuildReport {
    pub tags: usize,
    pub dimension: usize,
}

/// Build the similarity index from a vocabulary file and persist it.
///
/// Reads and deduplicates the vocabulary, embeds every unique tag in a single
/// batched backend call, L2-normalizes the vectors, and writes `tags.index`
/// plus the `tags.json` sidecar in the data directory, replacing any previous
/// build. Position `i` of the sidecar corresponds to row `i` of the index.
///
/// Nothing is written until every embedding has been computed, so a backend
/// failure leaves the previous artifacts untouched.
pub fn build_index(
    vocabulary_path: &Path,
    data_dir: &DataDir,
    backend: &dyn EmbeddingBackend,
) -> Result<BuildReport> {
    let tags = load_vocabulary(vocabulary_path)?;
    if tags.is_empty() {
        return Err(Error::Config(format!(
            "vocabulary file {} contains no tags",
            vocabulary_path.display()
        )));
    }

    let vectors = backend.embed_batch(&tags)?;
    if vectors.len() != tags.len() {
        return Err(Error::Backend(format!(
            "embedding backend returned {} vectors for {} tags",
            vectors.len(),
            tags.len()
        )));
    }

    let dimension = vectors[0].len();
    let mut index = TagIndex::new(dimension);
    for mut vector in vectors {
        if vector.len() != dimension {
            return Err(Error::Backend(
                "embedding backend returned vectors of mixed dimension"
                    .into(),
            ));
        }
        l2_normalize(&mut vector);
        index.add(&vector);
    }

    index.write_to(&data_dir.index_file())?;
    std::fs::write(
        data_dir.tag_list_file(),
        serde_json::to_vec_pretty(&tags)?,
    )?;

    Ok(BuildReport {
        tags: tags.len(),
        dimension,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Deterministic stand-in for the embedding backend: each text maps to a
    /// fixed vector keyed by its position in the fixture list.
    struct FixtureBackend {
        vectors: Vec<Vec<f32>>,
        fail: bool,
    }

    impl EmbeddingBackend for FixtureBackend {
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                return Err(Error::Backend("embedding service down".into()));
            }
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| self.vectors[i].clone())
                .collect())
        }
    }

    fn write_vocabulary(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn builds_aligned_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let vocab = write_vocabulary(
            "- tag: fine line tattoo\n\
             - tag: septum piercing\n\
             - tag: fine line tattoo\n",
        );
        let backend = FixtureBackend {
            vectors: vec![vec![3.0, 0.0], vec![0.0, 5.0]],
            fail: false,
        };

        let report =
            build_index(vocab.path(), &data_dir, &backend).unwrap();
        assert_eq!(report.tags, 2);
        assert_eq!(report.dimension, 2);

        let tags: Vec<String> = serde_json::from_slice(
            &std::fs::read(data_dir.tag_list_file()).unwrap(),
        )
        .unwrap();
        assert_eq!(tags, vec!["fine line tattoo", "septum piercing"]);

        // Rows are normalized and stay aligned with the sidecar.
        let index = TagIndex::read_from(&data_dir.index_file()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.row(0), &[1.0, 0.0]);
        assert_eq!(index.row(1), &[0.0, 1.0]);
    }

    #[test]
    fn backend_failure_persists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let vocab = write_vocabulary("- tag: sleeve tattoo\n");
        let backend = FixtureBackend {
            vectors: vec![],
            fail: true,
        };

        let err =
            build_index(vocab.path(), &data_dir, &backend).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert!(!data_dir.index_file().exists());
        assert!(!data_dir.tag_list_file().exists());
    }

    #[test]
    fn empty_vocabulary_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let vocab = write_vocabulary("[]\n");
        let backend = FixtureBackend {
            vectors: vec![],
            fail: false,
        };

        let err =
            build_index(vocab.path(), &data_dir, &backend).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rebuild_replaces_previous_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();

        let first = write_vocabulary(
            "- tag: sleeve tattoo\n\
             - tag: helix piercing\n",
        );
        let backend = FixtureBackend {
            vectors: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            fail: false,
        };
        build_index(first.path(), &data_dir, &backend).unwrap();

        let second = write_vocabulary("- tag: hand poke tattoo\n");
        let backend = FixtureBackend {
            vectors: vec![vec![2.0, 0.0]],
            fail: false,
        };
        build_index(second.path(), &data_dir, &backend).unwrap();

        let tags: Vec<String> = serde_json::from_slice(
            &std::fs::read(data_dir.tag_list_file()).unwrap(),
        )
        .unwrap();
        assert_eq!(tags, vec!["hand poke tattoo"]);

        let index = TagIndex::read_from(&data_dir.index_file()).unwrap();
        assert_eq!(index.len(), 1);
    }
}
