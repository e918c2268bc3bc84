//! Request/response envelopes for the storeq socket protocol

use serde::{Deserialize, Serialize};
use storeq_util::UserId;

use crate::{Reply, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnsupportedVersion,
    RateLimited,
    InternalError,
}

/// All commands a transport client can send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// One inbound chat message from a user
    Message { user_id: UserId, text: String },

    /// Command menu the transport should register
    ListCommands,

    Ping,
}

/// Successful response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Replies to deliver to the user, in order
    Replies { user_id: UserId, replies: Vec<Reply> },

    Commands { commands: Vec<CommandInfo> },

    Pong,
}

/// A command menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_request_wire_format() {
        let request = Request::new(
            7,
            Command::Message {
                user_id: UserId::new("1001"),
                text: "kfc004".into(),
            },
        );

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""type":"message""#));
        assert!(json.contains(r#""user_id":"1001""#));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 7);
        assert_eq!(parsed.api_version, API_VERSION);
    }

    #[test]
    fn error_response_wire_format() {
        let response = Response::error(3, ErrorInfo::new(ErrorCode::RateLimited, "slow down"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""err""#));
        assert!(json.contains(r#""rate_limited""#));
    }
}
