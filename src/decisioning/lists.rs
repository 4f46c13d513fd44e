use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{Decision, ListEntry, ListType};

/// Outcome of checking one list-like component against the candidate
/// entries fetched for the charge's search key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEvaluationResult {
    pub list_type: ListType,
    pub decision: Decision,
    pub test_decision: Decision,
    pub matched: Vec<ListEntry>,
    pub test_matched: Vec<ListEntry>,
    /// Raised only by a production-track white/black match; a shadow-only
    /// match stops the entry scan but never the console walk.
    pub terminal: bool,
}

impl ListEvaluationResult {
    fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            decision: Decision::Undecided,
            test_decision: Decision::Undecided,
            matched: Vec::new(),
            test_matched: Vec::new(),
            terminal: false,
        }
    }

    /// Whether the production bucket stayed empty. Drives the sticky
    /// graylist flag on gray results.
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Classify the candidate entries for one list type, in their fetched
/// order. Gray matches accumulate and the scan continues; the first
/// white/black match resolves the corresponding track and stops the scan.
pub(crate) fn classify(list_type: ListType, entries: &[ListEntry]) -> ListEvaluationResult {
    let mut result = ListEvaluationResult::new(list_type);

    for entry in entries {
        let Some(entry_type) = ListType::from_label(&entry.kind) else {
            warn!(entry = %entry.id, kind = %entry.kind, "skipping list entry with unrecognized kind");
            continue;
        };
        if entry_type != list_type {
            continue;
        }

        match list_type {
            ListType::Gray => {
                if entry.is_test {
                    result.test_matched.push(entry.clone());
                } else {
                    result.matched.push(entry.clone());
                }
            }
            ListType::White => {
                if entry.is_test {
                    result.test_decision = Decision::Accepted;
                    result.test_matched.push(entry.clone());
                } else {
                    result.decision = Decision::Accepted;
                    result.matched.push(entry.clone());
                    result.terminal = true;
                }
                return result;
            }
            ListType::Black => {
                if entry.is_test {
                    result.test_decision = Decision::Declined;
                    result.test_matched.push(entry.clone());
                } else {
                    result.decision = Decision::Declined;
                    result.matched.push(entry.clone());
                    result.terminal = true;
                }
                return result;
            }
        }
    }

    result
}
