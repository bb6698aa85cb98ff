use std::fmt;

use surge_errors::{SurgeError, SurgeResult};

use crate::entities::{Job, JobPayload};

pub const GET_PREFIX: &str = "GET:";
pub const DATA_PREFIX: &str = "DATA:";
pub const FAILED_PREFIX: &str = "FAILED:";
pub const COMPLETE_PREFIX: &str = "COMPLETE:";

/// Worker 发往队列的帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    RequestJob,
    JobFailed,
    JobComplete { id: String },
}

impl OutboundFrame {
    pub fn complete<S: Into<String>>(id: S) -> Self {
        OutboundFrame::JobComplete { id: id.into() }
    }

    pub fn encode(&self) -> String {
        match self {
            OutboundFrame::RequestJob => GET_PREFIX.to_string(),
            OutboundFrame::JobFailed => FAILED_PREFIX.to_string(),
            OutboundFrame::JobComplete { id } => format!("{COMPLETE_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// 队列发往 Worker 的帧
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    QueueEmpty,
    Job(Job),
}

impl InboundFrame {
    pub fn decode(text: &str) -> SurgeResult<Self> {
        let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
            return Err(SurgeError::protocol_error(format!(
                "unexpected frame: {}",
                truncate(text, 64)
            )));
        };

        if payload.is_empty() {
            return Ok(InboundFrame::QueueEmpty);
        }

        let payload: JobPayload = serde_json::from_str(payload).map_err(|e| {
            SurgeError::protocol_error(format!("malformed job payload: {e}"))
        })?;
        Ok(InboundFrame::Job(Job::try_from(payload)?))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
