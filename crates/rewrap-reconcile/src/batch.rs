//! Paged submission of remote commands.
//!
//! Commands are split into pages no larger than the limit of the target
//! operation and sent strictly one page after another. A page that fails,
//! or answers with the wrong number of outcomes, ends the submission; the
//! outcomes of the pages before it are kept.

use std::future::Future;

use rewrap_directory::{self as directory, RemoteOutcome};

use crate::error::ReconcileError;

/// Result of a paged submission.
#[derive(Debug)]
pub struct BatchResult {
    /// One outcome per command, for the leading commands that were
    /// submitted and attributed.
    pub outcomes: Vec<RemoteOutcome>,

    /// Number of pages sent, including a failed one.
    pub pages: usize,

    /// Why submission stopped early, if it did.
    pub halt: Option<ReconcileError>,
}

impl BatchResult {
    /// Whether every page was submitted and attributed.
    pub fn is_complete(&self) -> bool {
        self.halt.is_none()
    }
}

/// Splits commands into pages and submits them in order.
#[derive(Debug, Clone, Copy)]
pub struct BatchSubmitter {
    page_size: usize,
}

impl BatchSubmitter {
    /// Create a submitter with the given page size (at least 1).
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// The page size in use.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Submit `ops` page by page through `call`.
    ///
    /// `call` is not invoked for an empty list. Page `n + 1` is only built
    /// after page `n` has been answered.
    pub async fn submit<Op, F, Fut>(&self, ops: Vec<Op>, mut call: F) -> BatchResult
    where
        F: FnMut(Vec<Op>) -> Fut,
        Fut: Future<Output = directory::Result<Vec<RemoteOutcome>>>,
    {
        let total = ops.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut remaining = ops.into_iter();
        let mut pages = 0;

        loop {
            let page: Vec<Op> = remaining.by_ref().take(self.page_size).collect();
            if page.is_empty() {
                break;
            }
            pages += 1;
            let sent = page.len();

            tracing::debug!(page = pages, sent, total, "submitting page");

            match call(page).await {
                Ok(page_outcomes) if page_outcomes.len() == sent => {
                    outcomes.extend(page_outcomes);
                }
                Ok(page_outcomes) => {
                    let received = page_outcomes.len();
                    tracing::warn!(page = pages, sent, received, "outcome count mismatch, halting");
                    return BatchResult {
                        outcomes,
                        pages,
                        halt: Some(ReconcileError::ProtocolAnomaly {
                            page: pages,
                            sent,
                            received,
                        }),
                    };
                }
                Err(e) => {
                    tracing::warn!(page = pages, error = %e, "page submission failed, halting");
                    return BatchResult {
                        outcomes,
                        pages,
                        halt: Some(e.into()),
                    };
                }
            }
        }

        BatchResult {
            outcomes,
            pages,
            halt: None,
        }
    }
}
