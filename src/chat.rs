//! Chat transcript and the submit → ask → reply flow.

use log::warn;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

use crate::api::{ApiClient, ApiError};

/// Bot message shown for any failed ask
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again later.";

/// Anything that can answer a question
pub trait Ask {
    fn ask(&self, query: &str) -> Result<String, ApiError>;
}

impl Ask for ApiClient {
    fn ask(&self, query: &str) -> Result<String, ApiError> {
        ApiClient::ask(self, query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, text: impl Into<String>) -> &Message {
        self.messages.push(Message {
            role,
            text: text.into(),
            at: OffsetDateTime::now_utc(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Handle for one submission; goes stale once a newer submission starts.
#[derive(Debug, Clone)]
pub struct CancelToken {
    issued: u64,
    latest: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.issued
    }
}

/// A submitted question waiting for its reply
#[derive(Debug)]
pub struct PendingAsk {
    pub query: String,
    pub token: CancelToken,
}

#[derive(Debug, Default)]
pub struct ChatController {
    transcript: Transcript,
    latest: Arc<AtomicU64>,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Start a submission. Blank input is ignored; otherwise the user message is
    /// appended and any earlier in-flight submission is cancelled.
    pub fn begin(&mut self, input: &str) -> Option<PendingAsk> {
        let query = input.trim();
        if query.is_empty() {
            return None;
        }
        self.transcript.push(Role::User, query);
        let issued = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Some(PendingAsk {
            query: query.to_string(),
            token: CancelToken {
                issued,
                latest: Arc::clone(&self.latest),
            },
        })
    }

    /// Cancel whatever submission is in flight
    pub fn cancel_pending(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Record the outcome of a submission. Stale replies are dropped.
    pub fn settle(
        &mut self,
        pending: PendingAsk,
        outcome: Result<String, ApiError>,
    ) -> Option<&Message> {
        if pending.token.is_cancelled() {
            return None;
        }
        let text = match outcome {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Network error to API: {e}");
                NETWORK_ERROR_MESSAGE.to_string()
            }
        };
        Some(self.transcript.push(Role::Bot, text))
    }

    /// Submit and wait for the reply in one step
    pub fn submit(&mut self, input: &str, api: &dyn Ask) -> Option<&Message> {
        let pending = self.begin(input)?;
        let outcome = api.ask(&pending.query);
        self.settle(pending, outcome)
    }
}
