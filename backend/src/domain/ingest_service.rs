//! Ingestion of LLM-parsed expense candidates.
//!
//! The parsing collaborator is opaque: it hands over zero or more structured
//! candidates, and each becomes one independent submit. Media-backed input
//! (voice notes, photos) may need its upload to finish server-side
//! processing first; that wait is a bounded delay-and-repoll with a terminal
//! timeout rather than an open-ended loop.

use anyhow::Result;
use log::{debug, error, info};
use std::time::Duration;

use shared::{ParsedExpenseData, SubmitOutcome};

use super::errors::WalletError;
use super::expense_service::ExpenseService;
use crate::storage::traits::Connection;

pub const DEFAULT_MEDIA_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_MEDIA_POLL_DELAY: Duration = Duration::from_secs(2);

/// Collaborator-side view of an uploaded media file's processing state.
pub trait MediaProcessingProbe {
    /// True once the upload is processed and ready to be parsed.
    fn is_ready(&self, upload_id: &str) -> Result<bool>;
}

/// Result of submitting one parsed candidate.
pub struct CandidateOutcome {
    pub candidate: ParsedExpenseData,
    pub result: Result<SubmitOutcome, WalletError>,
}

#[derive(Clone)]
pub struct IngestService<C: Connection> {
    expense_service: ExpenseService<C>,
    media_poll_attempts: u32,
    media_poll_delay: Duration,
}

impl<C: Connection> IngestService<C> {
    pub fn new(expense_service: ExpenseService<C>) -> Self {
        Self::with_media_poll(
            expense_service,
            DEFAULT_MEDIA_POLL_ATTEMPTS,
            DEFAULT_MEDIA_POLL_DELAY,
        )
    }

    pub fn with_media_poll(
        expense_service: ExpenseService<C>,
        media_poll_attempts: u32,
        media_poll_delay: Duration,
    ) -> Self {
        Self {
            expense_service,
            media_poll_attempts,
            media_poll_delay,
        }
    }

    /// Submit each candidate independently; one failure never stops the
    /// rest. Outcomes come back in candidate order.
    pub fn ingest(&self, user_id: &str, candidates: Vec<ParsedExpenseData>) -> Vec<CandidateOutcome> {
        info!(
            "Ingesting {} parsed candidates for user {}",
            candidates.len(),
            user_id
        );

        candidates
            .into_iter()
            .map(|candidate| {
                let input = candidate.clone().into_expense_input();
                let result = self.expense_service.submit(user_id, &input);
                if let Err(err) = &result {
                    error!(
                        "Candidate '{}' failed to submit for user {}: {}",
                        candidate.name, user_id, err
                    );
                }
                CandidateOutcome { candidate, result }
            })
            .collect()
    }

    /// Wait for an uploaded media file to finish processing, polling at a
    /// fixed delay up to the attempt cap.
    pub fn wait_for_media(
        &self,
        probe: &dyn MediaProcessingProbe,
        upload_id: &str,
    ) -> Result<(), WalletError> {
        for attempt in 1..=self.media_poll_attempts {
            match probe.is_ready(upload_id) {
                Ok(true) => {
                    debug!(
                        "Media upload {} ready after {} attempt(s)",
                        upload_id, attempt
                    );
                    return Ok(());
                }
                Ok(false) => {
                    debug!(
                        "Media upload {} still processing (attempt {}/{})",
                        upload_id, attempt, self.media_poll_attempts
                    );
                }
                Err(err) => return Err(WalletError::Transaction(err)),
            }

            if attempt < self.media_poll_attempts && !self.media_poll_delay.is_zero() {
                std::thread::sleep(self.media_poll_delay);
            }
        }

        Err(WalletError::Timeout {
            attempts: self.media_poll_attempts,
        })
    }
}
