// Suggestion application: anchor resolution + annotation transaction.
//
// Every suggestion is applied on its own against the current document.
// A failure drops that suggestion only and is recorded in the report.

pub mod anchor;
pub mod resolution;
pub mod transaction;

use redline_common::types::{AuthorMeta, DocumentRange, Suggestion};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::DocumentModel;
use crate::error::SuggestError;

use self::anchor::AnchorResolver;
use self::transaction::TransactionBuilder;

/// Outcome of one applied suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedSuggestion {
    pub suggestion_id: Uuid,
    pub range: DocumentRange,
    pub delete_id: Option<Uuid>,
    pub insert_id: Option<Uuid>,
    /// Anchor occurrences found; more than one means the first was used.
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedSuggestion {
    /// Position of the suggestion in its payload.
    pub index: usize,
    pub suggestion: Suggestion,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<AppliedSuggestion>,
    pub dropped: Vec<DroppedSuggestion>,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied.extend(other.applied);
        self.dropped.extend(other.dropped);
    }

    pub fn ambiguous_count(&self) -> usize {
        self.applied.iter().filter(|applied| applied.match_count > 1).count()
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionApplier {
    resolver: AnchorResolver,
    builder: TransactionBuilder,
}

impl SuggestionApplier {
    pub fn new(resolver: AnchorResolver, builder: TransactionBuilder) -> Self {
        Self { resolver, builder }
    }

    /// Applier with default match cap for `author`.
    pub fn for_author(author: AuthorMeta) -> Self {
        Self::new(AnchorResolver::default(), TransactionBuilder::new(author))
    }

    pub fn author(&self) -> &AuthorMeta {
        self.builder.author()
    }

    /// Resolve, build and dispatch one suggestion.
    pub fn apply<D>(&self, doc: &D, suggestion: &Suggestion) -> Result<AppliedSuggestion, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        let resolved = self.resolver.resolve(doc, suggestion)?;
        let transaction = self.builder.build(
            resolved.range,
            &suggestion.text_replacement,
            Some(suggestion.reason.as_str()),
        )?;

        let applied = AppliedSuggestion {
            suggestion_id: transaction.suggestion_id,
            range: resolved.range,
            delete_id: transaction.delete.as_ref().map(|annotation| annotation.id),
            insert_id: transaction.insert.as_ref().map(|annotation| annotation.id),
            match_count: resolved.match_count,
        };
        doc.dispatch(transaction.mutation)?;

        debug!(
            suggestion_id = %applied.suggestion_id,
            from = applied.range.from,
            to = applied.range.to,
            "applied suggestion"
        );
        Ok(applied)
    }

    /// Apply a batch in order; each suggestion sees the document as left by
    /// the previous ones.
    pub fn apply_all<D>(&self, doc: &D, suggestions: &[Suggestion]) -> ApplyReport
    where
        D: DocumentModel + ?Sized,
    {
        let mut report = ApplyReport::default();

        for (index, suggestion) in suggestions.iter().enumerate() {
            match self.apply(doc, suggestion) {
                Ok(applied) => report.applied.push(applied),
                Err(error) => {
                    match &error {
                        SuggestError::AnchorNotFound { .. } | SuggestError::EmptyNoOp => {
                            debug!(index, code = error.code(), "dropping suggestion");
                        }
                        _ => warn!(index, code = error.code(), %error, "dropping suggestion"),
                    }
                    report.dropped.push(DroppedSuggestion {
                        index,
                        suggestion: suggestion.clone(),
                        code: error.code(),
                        message: error.to_string(),
                    });
                }
            }
        }

        info!(
            applied = report.applied.len(),
            dropped = report.dropped.len(),
            "suggestion batch applied"
        );
        report
    }
}
