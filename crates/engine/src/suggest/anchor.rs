// Context-anchored suggestion → tree range.
//
// The anchor (`before + target + after`) is searched as an escaped literal
// against the flattened text of the current document, then the target
// sub-range is mapped back onto tree positions through the text runs. The
// search runs on every apply; positions are never cached between calls.

use redline_common::types::{DocumentRange, Suggestion};
use regex::Regex;
use tracing::{debug, warn};

use crate::document::{DocumentModel, TextRun};
use crate::error::SuggestError;

/// Upper bound on collected match offsets.
pub const DEFAULT_MAX_MATCHES: usize = 1000;

/// Which neighbouring run an offset on a run boundary resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// The run that starts at the offset (range starts).
    Forward,
    /// The run that ends at the offset (range ends and insertion points).
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnchor {
    pub range: DocumentRange,
    /// Target sub-range in flattened-text byte offsets.
    pub flat_start: usize,
    pub flat_end: usize,
    /// Number of anchor occurrences found, capped at the resolver's limit.
    pub match_count: usize,
}

impl ResolvedAnchor {
    pub fn is_ambiguous(&self) -> bool {
        self.match_count > 1
    }
}

#[derive(Debug, Clone)]
pub struct AnchorResolver {
    max_matches: usize,
}

impl Default for AnchorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MATCHES)
    }
}

impl AnchorResolver {
    pub fn new(max_matches: usize) -> Self {
        Self { max_matches: max_matches.max(1) }
    }

    /// Resolve against the document as it is right now.
    pub fn resolve<D>(&self, doc: &D, suggestion: &Suggestion) -> Result<ResolvedAnchor, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        self.resolve_in(&doc.text_runs(), suggestion)
    }

    /// Resolve against a run snapshot taken by the caller.
    pub fn resolve_in(
        &self,
        runs: &[TextRun],
        suggestion: &Suggestion,
    ) -> Result<ResolvedAnchor, SuggestError> {
        let anchor = suggestion.anchor();
        if anchor.is_empty() {
            return Err(SuggestError::AnchorNotFound { anchor });
        }

        let pattern = format!(
            "{}{}{}",
            regex::escape(&suggestion.text_before),
            regex::escape(&suggestion.text_to_replace),
            regex::escape(&suggestion.text_after),
        );
        let needle = match Regex::new(&pattern) {
            Ok(needle) => needle,
            Err(error) => {
                warn!(%error, anchor_len = anchor.len(), "anchor pattern rejected");
                return Err(SuggestError::AnchorNotFound { anchor });
            }
        };

        let flat: String = runs.iter().map(|run| run.text.as_str()).collect();
        let starts: Vec<usize> =
            needle.find_iter(&flat).take(self.max_matches).map(|found| found.start()).collect();

        let Some(&first) = starts.first() else {
            debug!(anchor = anchor.as_str(), "anchor not found");
            return Err(SuggestError::AnchorNotFound { anchor });
        };
        if starts.len() > 1 {
            warn!(
                anchor = anchor.as_str(),
                matches = starts.len(),
                offset = first,
                "ambiguous anchor; using first occurrence"
            );
        }

        let flat_start = first + suggestion.text_before.len();
        let flat_end = flat_start + suggestion.text_to_replace.len();

        let range = if flat_start == flat_end {
            let at = map_offset(runs, flat_start, Bias::Backward)?;
            DocumentRange::new(at, at)
        } else {
            DocumentRange::new(
                map_offset(runs, flat_start, Bias::Forward)?,
                map_offset(runs, flat_end, Bias::Backward)?,
            )
        };

        Ok(ResolvedAnchor { range, flat_start, flat_end, match_count: starts.len() })
    }
}

/// Map a flattened-text offset to a tree position.
///
/// Offsets inside a run are unambiguous. On a boundary between two runs the
/// bias picks the side; if that side has no run (document start or end) the
/// other side is used.
pub fn map_offset(runs: &[TextRun], offset: usize, bias: Bias) -> Result<u32, SuggestError> {
    find_in_run(runs, offset, bias)
        .or_else(|| find_in_run(runs, offset, flip(bias)))
        .ok_or(SuggestError::RangeMapping { offset })
}

fn find_in_run(runs: &[TextRun], offset: usize, bias: Bias) -> Option<u32> {
    let run = runs.iter().find(|run| match bias {
        Bias::Forward => offset >= run.flat_start && offset < run.flat_end(),
        Bias::Backward => offset > run.flat_start && offset <= run.flat_end(),
    })?;
    Some(run.tree_start + (offset - run.flat_start) as u32)
}

fn flip(bias: Bias) -> Bias {
    match bias {
        Bias::Forward => Bias::Backward,
        Bias::Backward => Bias::Forward,
    }
}
