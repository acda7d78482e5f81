use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One record of the vocabulary source. Extra fields (category, aliases, …)
/// are ignored; only `tag` matters here.
#[derive(Debug, Deserialize)]
struct VocabularyEntry {
    tag: String,
}

/// Load the controlled tag vocabulary from a YAML sequence of records.
///
/// Tags are trimmed and deduplicated by exact string equality, keeping the
/// first occurrence so positions stay meaningful across rebuilds of an
/// unchanged source. A missing or unparseable file is a configuration error.
pub fn load_vocabulary(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "cannot read vocabulary file {}: {e}",
            path.display()
        ))
    })?;

    let entries: Vec<VocabularyEntry> =
        serde_yaml::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "malformed vocabulary file {}: {e}",
                path.display()
            ))
        })?;

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for entry in entries {
        let tag = entry.tag.trim().to_string();
        if !tag.is_empty() && seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_vocabulary(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_tags_in_source_order() {
        let file = write_vocabulary(
            "- tag: fine line tattoo\n\
             - tag: septum piercing\n\
             - tag: geometric tattoo\n",
        );

        let tags = load_vocabulary(file.path()).unwrap();
        assert_eq!(
            tags,
            vec!["fine line tattoo", "septum piercing", "geometric tattoo"]
        );
    }

    #[test]
    fn deduplicates_keeping_first_occurrence() {
        let file = write_vocabulary(
            "- tag: sleeve tattoo\n\
             - tag: helix piercing\n\
             - tag: sleeve tattoo\n\
             - tag: helix piercing\n",
        );

        let tags = load_vocabulary(file.path()).unwrap();
        assert_eq!(tags, vec!["sleeve tattoo", "helix piercing"]);
    }

    #[test]
    fn trims_whitespace_and_drops_blank_tags() {
        let file = write_vocabulary(
            "- tag: '  dermal piercing '\n\
             - tag: '   '\n",
        );

        let tags = load_vocabulary(file.path()).unwrap();
        assert_eq!(tags, vec!["dermal piercing"]);
    }

    #[test]
    fn ignores_extra_fields() {
        let file = write_vocabulary(
            "- tag: blackwork tattoo\n  category: tattoo\n",
        );

        let tags = load_vocabulary(file.path()).unwrap();
        assert_eq!(tags, vec!["blackwork tattoo"]);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_vocabulary(Path::new("/nonexistent/tags.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn entry_without_tag_field_is_config_error() {
        let file = write_vocabulary("- name: not a tag\n");
        let err = load_vocabulary(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
