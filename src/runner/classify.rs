use crate::error::{ClassifiedError, ErrorCode, ToolError};
use regex::Regex;
use std::io::ErrorKind;
use std::sync::LazyLock;

static NETWORK_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(ECONNREFUSED|ECONNRESET|ENOTFOUND|EAI_AGAIN|EPIPE|connection (refused|reset))\b",
    )
    .ok()
});
static TIMEOUT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(ETIMEDOUT|timed out|deadline exceeded)\b").ok());
static STATUS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bHTTP (\d{3})\b").ok());

/// Normalize a tool failure into a code and a retry verdict. Never fails.
pub fn classify(error: &ToolError) -> ClassifiedError {
    let message = error.to_string();

    match error {
        ToolError::Cancelled => ClassifiedError::cancelled(),
        ToolError::Connection(_) => network(message),
        ToolError::Timeout(_) => timeout(message),
        ToolError::Http { status, .. } => http(message, *status),
        ToolError::Request(e) => {
            if e.is_timeout() {
                timeout(message)
            } else if e.is_connect() {
                network(message)
            } else if let Some(status) = e.status() {
                http(message, status.as_u16())
            } else if e.is_request() {
                network(message)
            } else {
                unknown(message)
            }
        }
        ToolError::Io(e) => match e.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrInUse
            | ErrorKind::AddrNotAvailable
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => network(message),
            ErrorKind::TimedOut => timeout(message),
            _ => unknown(message),
        },
        ToolError::NonZeroExit { stderr, .. } => {
            classify_message(stderr, &message).unwrap_or_else(|| unknown(message))
        }
        ToolError::Other(text) => {
            classify_message(text, &message).unwrap_or_else(|| unknown(message))
        }
        ToolError::Decode(_) => unknown(message),
    }
}

/// Recognize well-known transport markers inside free-form error text
fn classify_message(text: &str, message: &str) -> Option<ClassifiedError> {
    if NETWORK_RE.as_ref()?.is_match(text) {
        return Some(network(message.to_string()));
    }

    if TIMEOUT_RE.as_ref()?.is_match(text) {
        return Some(timeout(message.to_string()));
    }

    let status: u16 = STATUS_RE
        .as_ref()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    Some(http(message.to_string(), status))
}

fn network(message: String) -> ClassifiedError {
    ClassifiedError {
        message,
        http_status: None,
        code: ErrorCode::Network,
        is_retryable: true,
    }
}

fn timeout(message: String) -> ClassifiedError {
    ClassifiedError {
        message,
        http_status: None,
        code: ErrorCode::Timeout,
        is_retryable: true,
    }
}

fn http(message: String, status: u16) -> ClassifiedError {
    ClassifiedError {
        message,
        http_status: Some(status),
        code: ErrorCode::Http,
        is_retryable: status >= 500 || status == 429,
    }
}

fn unknown(message: String) -> ClassifiedError {
    ClassifiedError {
        message,
        http_status: None,
        code: ErrorCode::Unknown,
        is_retryable: false,
    }
}
