use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::error::{Error, Result};
use crate::sources::CorpusLoader;
use crate::training::Document;

/// Folder of `Articles_<Section>*.json` files, each a JSON array of
/// records whose `allwords` field holds the article text. The label is
/// the category whose name follows `Articles_`.
#[derive(Debug, Clone)]
pub struct ArticleFolderCorpus {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    allwords: Option<String>,
}

impl ArticleFolderCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Files belonging to `category`, sorted by name.
    fn files_for(&self, category: Category) -> Result<Vec<PathBuf>> {
        let prefix = format!("Articles_{}", category.name());
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
            if matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl CorpusLoader for ArticleFolderCorpus {
    fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut skipped = 0usize;
        for category in Category::ALL {
            for path in self.files_for(category)? {
                let records: Vec<ArticleRecord> = serde_json::from_str(&fs::read_to_string(&path)?)
                    .map_err(|e| Error::InvalidCorpus(format!("{}: {e}", path.display())))?;
                debug!(path = %path.display(), records = records.len(), %category, "article file read");
                for record in records {
                    match record.allwords {
                        Some(text) if !text.trim().is_empty() => {
                            documents.push(Document::labeled(text, category.code()))
                        }
                        _ => skipped += 1,
                    }
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, "skipped article records without text");
        }
        info!(dir = %self.dir.display(), documents = documents.len(), "article folder loaded");
        Ok(documents)
    }
}

/// JSON Lines file of `{"text": ..., "label": ...}` records.
#[derive(Debug, Clone)]
pub struct JsonLinesCorpus {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LabeledLine {
    text: String,
    label: u32,
}

impl JsonLinesCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusLoader for JsonLinesCorpus {
    fn load(&self) -> Result<Vec<Document>> {
        let contents = fs::read_to_string(&self.path)?;
        let documents = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                let record: LabeledLine = serde_json::from_str(line)
                    .map_err(|e| Error::InvalidCorpus(format!("{} line {}: {e}", self.path.display(), idx + 1)))?;
                Ok(Document::labeled(record.text, record.label))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(path = %self.path.display(), documents = documents.len(), "corpus file loaded");
        Ok(documents)
    }
}
