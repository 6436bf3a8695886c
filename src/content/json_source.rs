use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::content::{ContentItem, ContentKind, ContentSource};
use crate::error::{LexreelError, LexreelResult};

/// File-backed content store: one JSON document holding dated records.
///
/// Records keep their document order, so fetch order is stable across
/// calls as the trait requires.
pub struct JsonContentSource {
    path: PathBuf,
}

#[derive(Deserialize)]
struct Record {
    date: NaiveDate,
    kind: ContentKind,
    #[serde(flatten)]
    item: ContentItem,
}

#[derive(Deserialize)]
struct Document {
    items: Vec<Record>,
}

impl JsonContentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> LexreelResult<Document> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read content store '{}'", self.path.display()))?;
        let doc = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse content store '{}'", self.path.display()))?;
        Ok(doc)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentSource for JsonContentSource {
    fn fetch_by_date(&self, date: NaiveDate, kind: ContentKind) -> LexreelResult<Vec<ContentItem>> {
        let doc = self.load()?;
        let items: Vec<ContentItem> = doc
            .items
            .into_iter()
            .filter(|r| r.date == date && r.kind == kind)
            .map(|r| r.item)
            .collect();
        if items.is_empty() {
            return Err(LexreelError::not_found(format!(
                "no {kind} content for {date}"
            )));
        }
        Ok(items)
    }
}
