//! Ordered aggregator of heterogeneous staged updates
//!
//! A [`Transaction`] owns a queue of boxed [`PendingUpdate`] handles and
//! commits them in insertion order, each through its [`RetryPolicy`]. It
//! stops at the first failure; updates that already committed are dropped
//! from the queue so a later `commit()` resumes at the failed one.

use std::collections::VecDeque;
use std::time::Instant;

use stagehand_core_types::RequestContext;

use crate::errors::Status;
use crate::pending_update::PendingUpdate;
use crate::retry::RetryPolicy;
use crate::{log_op_end, log_op_error, log_op_start};

const OP_COMMIT: &str = "transaction.commit";

/// Multi-update commit in insertion order
pub struct Transaction {
    context: RequestContext,
    retry: RetryPolicy,
    pending: VecDeque<Box<dyn PendingUpdate>>,
    committed: usize,
}

impl Transaction {
    /// Create an empty transaction that retries conflicts with the default policy
    pub fn new() -> Self {
        Self::with_context(RequestContext::new())
    }

    pub fn with_context(context: RequestContext) -> Self {
        Self {
            context,
            retry: RetryPolicy::default(),
            pending: VecDeque::new(),
            committed: 0,
        }
    }

    /// Replace the retry policy applied to each member commit
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Queue an update; ownership moves into the transaction
    pub fn add<U>(&mut self, update: U) -> &mut Self
    where
        U: PendingUpdate + 'static,
    {
        self.pending.push_back(Box::new(update));
        self
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Updates not yet committed
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Updates committed so far by this transaction
    pub fn committed_count(&self) -> usize {
        self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn commit_pending(&mut self) -> Status {
        while let Some(update) = self.pending.front_mut() {
            let position = self.committed;
            self.retry.run(OP_COMMIT, |attempt| {
                tracing::debug!(
                    op = OP_COMMIT,
                    request_id = %self.context.request_id,
                    position = position,
                    attempt = attempt,
                    "Committing transaction member"
                );
                update.commit()
            })?;
            self.pending.pop_front();
            self.committed += 1;
        }
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingUpdate for Transaction {
    fn commit(&mut self) -> Status {
        let start = Instant::now();
        let request_id = self.context.request_id.clone();
        let trace_id = self.context.trace_id.clone();
        let trace = trace_id.as_ref().map(|t| t.as_str());
        log_op_start!(
            OP_COMMIT,
            request_id = %request_id,
            trace_id = trace,
            update_count = self.pending.len()
        );

        match self.commit_pending() {
            Ok(()) => {
                log_op_end!(
                    OP_COMMIT,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %request_id,
                    trace_id = trace,
                    committed = self.committed
                );
                Ok(())
            }
            Err(err) => {
                let err = err.with_request_id(request_id.clone());
                log_op_error!(
                    OP_COMMIT,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %request_id,
                    trace_id = trace,
                    committed = self.committed
                );
                Err(err)
            }
        }
    }
}
