//! What happens when a reader activates a marker.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Routes;
use crate::error::Error;
use crate::resolver::{parse_reference, reference_to_target, scripture_path};
use crate::types::{AnnotationDetail, AnnotationLookupRequest, Reference, ScriptureRef, Target};

/// Fetches full annotation content by kind and ID.
#[async_trait]
pub trait AnnotationLookup: Send + Sync {
    /// Look up one annotation.
    ///
    /// # Errors
    ///
    /// Returns `Error::LookupNotFound` when no annotation has this ID,
    /// or `Error::LookupFailed` for any other failure.
    async fn lookup(&self, request: &AnnotationLookupRequest) -> Result<AnnotationDetail, Error>;
}

/// How scripture markers respond to activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Behavior {
    /// Go straight to the referenced chapter.
    #[default]
    Navigate,
    /// Show the passage in a preview surface first.
    Preview,
}

/// Outcome of activating one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Activation {
    /// Navigate to an in-app path.
    Navigate {
        /// Target path with any fragment anchor.
        path: String,
    },
    /// The annotation was not found; the activation is a no-op.
    Nothing,
    /// Preview a scripture passage, with the path the preview links to.
    Preview {
        /// Reading path the preview links to.
        path: String,
        /// The previewed passage.
        reference: ScriptureRef,
    },
    /// Display fetched annotation content.
    ShowAnnotation {
        /// Fetched annotation.
        detail: AnnotationDetail,
    },
}

/// Resolve and act on one activated marker.
///
/// Annotation markers always fetch through `lookup`, whatever the behavior.
/// Book and library markers always navigate. Scripture markers follow `behavior`.
///
/// # Errors
///
/// Returns the parse error when `(tag, value)` is not a valid marker,
/// or `Error::LookupFailed` when the lookup fails for a reason other than not-found.
pub async fn handle_activation(
    tag: &str,
    value: &str,
    behavior: Behavior,
    routes: &Routes,
    lookup: &dyn AnnotationLookup,
) -> Result<Activation, Error> {
    let reference = parse_reference(tag, value)?;

    if let Reference::Scripture(scripture) = &reference
        && behavior == Behavior::Preview
    {
        return Ok(Activation::Preview {
            path: scripture_path(scripture, routes),
            reference: scripture.clone(),
        });
    }

    return match reference_to_target(&reference, routes) {
        Target::Navigate(target) => Ok(Activation::Navigate { path: target.path }),
        Target::Lookup(request) => match lookup.lookup(&request).await {
            Ok(detail) => Ok(Activation::ShowAnnotation { detail }),
            Err(Error::LookupNotFound { id, kind }) => {
                tracing::info!(%kind, %id, "annotation not found, ignoring activation");
                Ok(Activation::Nothing)
            },
            Err(e @ Error::LookupFailed { .. }) => Err(e),
            Err(e) => Err(Error::LookupFailed {
                id: request.id,
                kind: request.kind,
                reason: e.to_string(),
            }),
        },
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::types::AnnotationKind;

    /// Returns a canned detail for `f1`, not-found for `missing`, and fails otherwise.
    #[derive(Default)]
    struct StubLookup {
        /// Every request received, in order.
        calls: Mutex<Vec<AnnotationLookupRequest>>,
    }

    #[async_trait]
    impl AnnotationLookup for StubLookup {
        async fn lookup(&self, request: &AnnotationLookupRequest) -> Result<AnnotationDetail, Error> {
            self.calls.lock().unwrap().push(request.clone());
            return match request.id.as_str() {
                "f1" => Ok(AnnotationDetail {
                    id: "f1".to_string(),
                    kind: request.kind,
                    passage_ids: vec!["Gen_vchap1-1".to_string()],
                    patristic_citations: Vec::new(),
                    scripture_refs: Vec::new(),
                    text: "In the beginning".to_string(),
                    verse_display: "1:1".to_string(),
                }),
                "missing" => Err(Error::LookupNotFound {
                    id: request.id.clone(),
                    kind: request.kind,
                }),
                _ => Err(Error::Io(std::io::Error::other("connection reset"))),
            };
        }
    }

    fn routes() -> Routes {
        return Routes::default();
    }

    #[tokio::test]
    async fn annotation_shows_fetched_detail_regardless_of_behavior() {
        let lookup = StubLookup::default();
        for behavior in [Behavior::Navigate, Behavior::Preview] {
            let result = handle_activation("study", "f1", behavior, &routes(), &lookup).await.unwrap();
            assert!(matches!(result, Activation::ShowAnnotation { ref detail } if detail.id == "f1"));
        }
        let calls = lookup.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, AnnotationKind::Study);
    }

    #[tokio::test]
    async fn not_found_is_a_silent_no_op() {
        let lookup = StubLookup::default();
        let result = handle_activation("variant", "missing", Behavior::Navigate, &routes(), &lookup)
            .await
            .unwrap();
        assert_eq!(result, Activation::Nothing);
    }

    #[tokio::test]
    async fn other_lookup_failures_surface() {
        let lookup = StubLookup::default();
        let err = handle_activation("citation", "boom", Behavior::Navigate, &routes(), &lookup)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LookupFailed { ref id, .. } if id == "boom"));
    }

    #[tokio::test]
    async fn scripture_follows_behavior() {
        let lookup = StubLookup::default();
        let nav = handle_activation("SCRIPTURE", "genesis:1:3", Behavior::Navigate, &routes(), &lookup)
            .await
            .unwrap();
        assert_eq!(
            nav,
            Activation::Navigate {
                path: "/read/genesis/1#v3".to_string()
            }
        );

        let preview = handle_activation("SCRIPTURE", "genesis:1:3", Behavior::Preview, &routes(), &lookup)
            .await
            .unwrap();
        assert!(matches!(preview, Activation::Preview { ref path, .. } if path == "/read/genesis/1#v3"));
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn book_navigates_even_in_preview_mode() {
        let lookup = StubLookup::default();
        let result = handle_activation("book", "john", Behavior::Preview, &routes(), &lookup)
            .await
            .unwrap();
        assert_eq!(
            result,
            Activation::Navigate {
                path: "/read/john/1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn parse_failure_is_returned_for_that_marker() {
        let lookup = StubLookup::default();
        let err = handle_activation("footnote", "x", Behavior::Navigate, &routes(), &lookup)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnrecognizedMarkerType { .. }));
    }
}
