//! Per-message fault boundary.
//!
//! Whatever goes wrong while answering a mention is collected here, logged
//! one error at a time, and collapsed into a single `general_error` reply.
//! Nothing escapes to the listener.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::future::Future;

use tracing::{error, warn};

use crate::error::AgentError;

use super::context::ReplyChannel;
use super::policy::{Reply, ReplyKind, ReplyPolicy};

/// One captured error with the backtrace at the point it surfaced.
#[derive(Debug)]
pub struct Fault {
    pub error: AgentError,
    pub backtrace: Backtrace,
}

impl Fault {
    /// Record `error` with a backtrace of the caller. Call this where the
    /// error is first seen, not where faults are gathered up.
    #[inline(never)]
    pub fn new(error: AgentError) -> Self {
        Self {
            error,
            backtrace: Backtrace::capture(),
        }
    }
}

/// Every error raised while handling one message.
#[derive(Debug, thiserror::Error)]
#[error("{} error(s) while handling message", .faults.len())]
pub struct PipelineFailure {
    faults: Vec<Fault>,
}

impl PipelineFailure {
    pub fn new(faults: impl IntoIterator<Item = Fault>) -> Self {
        Self {
            faults: faults.into_iter().collect(),
        }
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Log each fault individually at error level.
    pub fn log(&self) {
        let total = self.faults.len();
        for (index, fault) in self.faults.iter().enumerate() {
            let chain = error_chain(&fault.error);
            if fault.backtrace.status() == BacktraceStatus::Captured {
                error!(
                    index = index + 1,
                    total,
                    error = %chain,
                    backtrace = %fault.backtrace,
                    "unhandled error while answering mention"
                );
            } else {
                error!(
                    index = index + 1,
                    total,
                    error = %chain,
                    "unhandled error while answering mention"
                );
            }
        }
    }
}

impl From<AgentError> for PipelineFailure {
    fn from(error: AgentError) -> Self {
        Self::new([Fault::new(error)])
    }
}

/// Render an error and all of its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        // thiserror messages often already embed the source text.
        if !out.contains(&cause_text) {
            out.push_str(": ");
            out.push_str(&cause_text);
        }
        source = cause.source();
    }
    out
}

/// Run `work` and deliver exactly one reply for it.
///
/// On success the chosen reply is sent. If `work` fails, or sending its reply
/// fails, every error is logged and the `general_error` template is sent
/// instead. A failure to send that fallback is logged and dropped.
pub async fn contain<R, F>(work: F, policy: &ReplyPolicy, channel: &R) -> ReplyKind
where
    R: ReplyChannel,
    F: Future<Output = Result<Reply, PipelineFailure>>,
{
    let failure = match work.await {
        Ok(reply) => match channel.reply(&reply.text).await {
            Ok(()) => return reply.kind,
            Err(e) => PipelineFailure::from(e),
        },
        Err(failure) => failure,
    };

    failure.log();

    let fallback = policy.failure();
    if let Err(e) = channel.reply(&fallback.text).await {
        warn!(error = %error_chain(&e), "failed to deliver error reply");
    }
    fallback.kind
}
