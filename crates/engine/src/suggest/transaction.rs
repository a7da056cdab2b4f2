// Resolved range + replacement → non-destructive annotation mutation.

use chrono::Utc;
use redline_common::crdt::origin::{OriginKind, OriginTag};
use redline_common::types::{AnnotationKind, AuthorMeta, DocumentRange, SuggestionAnnotation};
use uuid::Uuid;

use crate::document::Mutation;
use crate::error::SuggestError;

/// A built, not yet dispatched, suggestion mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionTransaction {
    /// Shared by the delete and insert halves of the suggestion.
    pub suggestion_id: Uuid,
    pub delete: Option<SuggestionAnnotation>,
    pub insert: Option<SuggestionAnnotation>,
    pub mutation: Mutation,
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    author: AuthorMeta,
}

impl TransactionBuilder {
    pub fn new(author: AuthorMeta) -> Self {
        Self { author }
    }

    pub fn author(&self) -> &AuthorMeta {
        &self.author
    }

    /// Mark `range` for deletion and insert `replacement` right after it.
    ///
    /// Both halves end up in one mutation tagged as a suggestion so organic
    /// edit watchers ignore it. An empty range with an empty replacement is
    /// rejected before anything is built.
    pub fn build(
        &self,
        range: DocumentRange,
        replacement: &str,
        reason: Option<&str>,
    ) -> Result<SuggestionTransaction, SuggestError> {
        if range.is_empty() && replacement.is_empty() {
            return Err(SuggestError::EmptyNoOp);
        }

        let suggestion_id = Uuid::new_v4();
        let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
        let origin = OriginTag::new(
            OriginKind::Suggestion,
            self.author.author_id.clone(),
            self.author.author_type,
        );
        let mut mutation = Mutation::new(origin);

        let delete = (!range.is_empty())
            .then(|| self.annotation(suggestion_id, AnnotationKind::Delete, reason));
        if let Some(delete) = &delete {
            mutation = mutation.mark_range(range.from, range.to, delete.clone());
        }

        let insert = (!replacement.is_empty())
            .then(|| self.annotation(suggestion_id, AnnotationKind::Insert, reason));
        if let Some(insert) = &insert {
            mutation = mutation.insert_text(range.to, replacement, Some(insert.clone()));
        }

        Ok(SuggestionTransaction { suggestion_id, delete, insert, mutation })
    }

    fn annotation(
        &self,
        suggestion_id: Uuid,
        kind: AnnotationKind,
        reason: Option<&str>,
    ) -> SuggestionAnnotation {
        SuggestionAnnotation {
            id: Uuid::new_v4(),
            suggestion_id,
            kind,
            author: self.author.clone(),
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}
