//! The uniform error taxonomy and the RPC failure classifier.
//!
//! Every public client operation resolves to `OperationResult<T>`; the error
//! side is always one of these variants, each with a message that is safe to
//! render directly. Raw transport errors or node error objects never cross
//! this boundary.

use crate::rpc::RpcFailure;
use regex::Regex;
use std::sync::OnceLock;

/// Uniform result contract for every public client operation.
pub type OperationResult<T> = Result<T, OperationError>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OperationError {
    // -- connectivity --
    #[error("Check your internet connection")]
    InternetUnavailable,
    #[error("Failed to connect to the blockchain, please try again later")]
    BlockchainUnavailable,
    #[error("Can not connect to the server, check your connection")]
    ConnectionTimeout,
    #[error("The server is not responding, please try again later")]
    ResponseTimeout,

    // -- key material --
    #[error("Wrong private key")]
    WrongKey,
    #[error("Wrong private posting key")]
    WrongPostingKey,
    #[error("Wrong private active key")]
    WrongActiveKey,

    // -- validation --
    #[error("{0}")]
    Validation(String),
    #[error("Insufficient funds, your balance is {0}")]
    InsufficientBalance(String),
    #[error("Unexpected profile data")]
    UnexpectedAccountData,

    // -- blockchain --
    #[error("{0}")]
    Assert(String),
    #[error("The node rejected the request: ({code}) {message}")]
    Rejected { code: i64, message: String },
    #[error("The server returned an unexpected error")]
    ServerError,

    // -- everything else --
    #[error("Something went wrong, please try again later")]
    Unexpected,
}

/// Coarse category, mirroring the error taxonomy the UI switches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Key,
    Validation,
    Blockchain,
    Unexpected,
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        use OperationError::*;
        match self {
            InternetUnavailable | BlockchainUnavailable | ConnectionTimeout | ResponseTimeout => {
                ErrorKind::Connectivity
            }
            WrongKey | WrongPostingKey | WrongActiveKey => ErrorKind::Key,
            Validation(_) | InsufficientBalance(_) | UnexpectedAccountData => ErrorKind::Validation,
            Assert(_) | Rejected { .. } | ServerError => ErrorKind::Blockchain,
            Unexpected => ErrorKind::Unexpected,
        }
    }
}

/// What kind of response the caller was waiting for. Only login gets special
/// treatment in classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Login,
    Broadcast,
}

const ASSERT_EXCEPTION: i64 = 10;
const MISSING_POSTING_AUTHORITY: i64 = 3030000;

fn assert_msg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "<lowercase word chars>: <message>" as emitted by node assert stacks
    RE.get_or_init(|| Regex::new(r"([a-z_][a-z_0-9]*):\s*(.+)").expect("assert msg regex"))
}

/// Map a raw RPC failure onto the taxonomy. Total: every input produces a
/// render-ready error.
pub fn classify(failure: &RpcFailure, kind: RequestKind) -> OperationError {
    match failure {
        RpcFailure::ConnectTimeout => OperationError::ConnectionTimeout,
        RpcFailure::ResponseTimeout => OperationError::ResponseTimeout,
        RpcFailure::Transport(_) => OperationError::ServerError,
        RpcFailure::Remote(remote) => {
            match remote.code {
                ASSERT_EXCEPTION => {
                    // Try to pull a human-readable fragment out of the first
                    // stack entry. The format is the node's text output and
                    // may drift; on no match we fall through to the generic
                    // rendering below.
                    if let Some(first) = remote.stack_formats.first() {
                        if let Some(caps) = assert_msg_re().captures(first) {
                            let fragment = caps[2].trim();
                            if !fragment.is_empty() {
                                return OperationError::Assert(fragment.to_string());
                            }
                        }
                    }
                    OperationError::Rejected {
                        code: remote.code,
                        message: remote.message.clone(),
                    }
                }
                MISSING_POSTING_AUTHORITY if kind == RequestKind::Login => OperationError::WrongKey,
                code => OperationError::Rejected {
                    code,
                    message: remote.message.clone(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RemoteError;

    fn remote(code: i64, message: &str, stack: &[&str]) -> RpcFailure {
        RpcFailure::Remote(RemoteError {
            code,
            message: message.to_string(),
            stack_formats: stack.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn transport_failures_map_in_order() {
        assert_eq!(
            classify(&RpcFailure::ConnectTimeout, RequestKind::Broadcast),
            OperationError::ConnectionTimeout
        );
        assert_eq!(
            classify(&RpcFailure::ResponseTimeout, RequestKind::Broadcast),
            OperationError::ResponseTimeout
        );
        assert_eq!(
            classify(&RpcFailure::Transport("http 502".into()), RequestKind::Broadcast),
            OperationError::ServerError
        );
    }

    #[test]
    fn assert_exception_extracts_fragment() {
        let f = remote(10, "Assert Exception", &["itr->vote_percent: You have already voted"]);
        assert_eq!(
            classify(&f, RequestKind::Broadcast),
            OperationError::Assert("You have already voted".into())
        );
    }

    #[test]
    fn assert_exception_falls_through_on_no_match() {
        let f = remote(10, "Assert Exception", &["NO COLON HERE"]);
        assert_eq!(
            classify(&f, RequestKind::Broadcast),
            OperationError::Rejected {
                code: 10,
                message: "Assert Exception".into()
            }
        );
        // empty stack behaves the same
        let f = remote(10, "Assert Exception", &[]);
        assert!(matches!(
            classify(&f, RequestKind::Broadcast),
            OperationError::Rejected { code: 10, .. }
        ));
    }

    #[test]
    fn missing_posting_authority_depends_on_context() {
        let f = remote(3030000, "missing required posting authority", &[]);
        assert_eq!(classify(&f, RequestKind::Login), OperationError::WrongKey);
        assert_eq!(
            classify(&f, RequestKind::Broadcast),
            OperationError::Rejected {
                code: 3030000,
                message: "missing required posting authority".into()
            }
        );
    }

    #[test]
    fn unknown_codes_render_code_and_message() {
        let f = remote(13, "unknown key", &[]);
        let err = classify(&f, RequestKind::Broadcast);
        assert_eq!(err.to_string(), "The node rejected the request: (13) unknown key");
        assert_eq!(err.kind(), ErrorKind::Blockchain);
    }
}
