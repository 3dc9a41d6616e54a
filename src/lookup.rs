//! Annotation lookup backed by a JSON dump of annotation details.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::activation::AnnotationLookup;
use crate::error::Error;
use crate::types::{AnnotationDetail, AnnotationKind, AnnotationLookupRequest};

/// In-memory annotation store keyed by `(kind, id)`.
#[derive(Debug, Default)]
pub struct FileAnnotationLookup {
    /// Loaded annotations.
    entries: HashMap<(AnnotationKind, String), AnnotationDetail>,
}

impl FileAnnotationLookup {
    /// Synchronous lookup for batch checks.
    pub fn get(&self, kind: AnnotationKind, id: &str) -> Option<&AnnotationDetail> {
        return self.entries.get(&(kind, id.to_string()));
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Load a JSON array of annotation details from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures,
    /// or `Error::Json` if the content is not an annotation array.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let details: Vec<AnnotationDetail> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), count = details.len(), "loaded annotation dump");
        return Ok(Self::new(details));
    }

    /// Build a store from already-decoded details. Later duplicates replace earlier ones.
    pub fn new(details: Vec<AnnotationDetail>) -> Self {
        let mut entries = HashMap::with_capacity(details.len());
        for detail in details {
            let key = (detail.kind, detail.id.clone());
            if entries.insert(key, detail).is_some() {
                tracing::warn!("duplicate annotation in dump, keeping the last one");
            }
        }
        return Self { entries };
    }
}

#[async_trait]
impl AnnotationLookup for FileAnnotationLookup {
    async fn lookup(&self, request: &AnnotationLookupRequest) -> Result<AnnotationDetail, Error> {
        return self
            .get(request.kind, &request.id)
            .cloned()
            .ok_or_else(|| {
                return Error::LookupNotFound {
                    id: request.id.clone(),
                    kind: request.kind,
                };
            });
    }
}
