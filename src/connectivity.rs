//! Collaborator traits the platform layer plugs into.
//!
//! The core never probes the network stack or talks to a crash backend
//! itself; it only asks these two questions through narrow seams.

/// Reports whether the device currently has network reachability.
pub trait ConnectionService: Send + Sync {
    fn is_connection_available(&self) -> bool;
}

/// Sink for unexpected failures. Whatever lands here is a bug, not a user
/// error, and is never shown verbatim to the user.
pub trait CrashReporter: Send + Sync {
    fn send_crash(&self, context: &str, detail: &str);
}

/// Default probe for environments without a platform hook: assume online and
/// let the RPC layer surface real connectivity failures.
pub struct AlwaysOnline;

impl ConnectionService for AlwaysOnline {
    fn is_connection_available(&self) -> bool {
        true
    }
}

/// Default reporter: the log stream is the crash backend.
pub struct LogReporter;

impl CrashReporter for LogReporter {
    fn send_crash(&self, context: &str, detail: &str) {
        log::error!("crash [{context}]: {detail}");
    }
}
