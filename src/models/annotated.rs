//! Tags and metadata layered over a finished diagnostic result
//!
//! The wrapped [`DiagnosticResult`] is held by value and only exposed through
//! shared references, so annotating never changes what the engine reported.

use crate::models::results::DiagnosticResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A diagnostic result plus caller-supplied labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedResult<T> {
    result: DiagnosticResult<T>,
    tags: BTreeSet<String>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl<T> AnnotatedResult<T> {
    /// Wrap a result; records when the annotation layer was created
    pub fn new(result: DiagnosticResult<T>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "annotated_at".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
        Self {
            result,
            tags: BTreeSet::new(),
            metadata,
        }
    }

    /// Add a tag. Duplicate tags collapse.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Attach a metadata entry, replacing an earlier value under the same key
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn result(&self) -> &DiagnosticResult<T> {
        &self.result
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Drop the annotations and hand back the untouched result
    pub fn into_inner(self) -> DiagnosticResult<T> {
        self.result
    }
}

impl<T> From<DiagnosticResult<T>> for AnnotatedResult<T> {
    fn from(result: DiagnosticResult<T>) -> Self {
        Self::new(result)
    }
}

/// Creates annotated results that start with a fixed set of tags
#[derive(Debug, Clone, Default)]
pub struct AnnotationTemplate {
    default_tags: BTreeSet<String>,
    default_metadata: BTreeMap<String, serde_json::Value>,
}

impl AnnotationTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.default_tags.insert(tag.into());
        self
    }

    pub fn metadata<K: Into<String>, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.default_metadata.insert(key.into(), value.into());
        self
    }

    pub fn apply<T>(&self, result: DiagnosticResult<T>) -> AnnotatedResult<T> {
        let mut annotated = AnnotatedResult::new(result).with_tags(self.default_tags.iter().cloned());
        for (key, value) in &self.default_metadata {
            annotated = annotated.with_metadata(key.clone(), value.clone());
        }
        annotated
    }
}
