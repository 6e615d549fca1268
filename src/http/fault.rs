//! Classification of panics caught by the recovery middleware.

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use crate::http::panic_hook;

/// Cause descriptions that mean the client socket is already gone.
const BROKEN_CONNECTION_MARKERS: [&str; 2] = ["broken pipe", "connection reset by peer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// The peer hung up. Nothing can be written back.
    BrokenConnection,
    /// Anything else.
    Generic,
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultClass::BrokenConnection => f.write_str("broken-connection"),
            FaultClass::Generic => f.write_str("generic"),
        }
    }
}

/// A panic payload that has been caught, described and classified.
#[derive(Debug, Clone)]
pub struct RecoveredFault {
    description: String,
    class: FaultClass,
    stack: Option<String>,
}

impl RecoveredFault {
    /// Inspect a `catch_unwind` payload.
    ///
    /// Generic faults carry a backtrace when `with_stack` is set. It is the
    /// one the panic hook recorded at the panic site; payloads that never
    /// went through the hook (`resume_unwind`, direct calls) get one taken
    /// here instead. The hook's slot is drained either way.
    pub fn capture(payload: &(dyn Any + Send), with_stack: bool) -> Self {
        let panic_site = panic_hook::take_trace();

        let class = match network_cause(payload) {
            Some(cause) if is_broken_connection(&cause) => FaultClass::BrokenConnection,
            _ => FaultClass::Generic,
        };

        let stack = (class == FaultClass::Generic && with_stack)
            .then(|| panic_site.unwrap_or_else(|| Backtrace::force_capture().to_string()));

        Self {
            description: describe(payload),
            class,
            stack,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn class(&self) -> FaultClass {
        self.class
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

/// Case-insensitive substring match against the broken-connection markers.
pub fn is_broken_connection(cause: &str) -> bool {
    let cause = cause.to_lowercase();
    BROKEN_CONNECTION_MARKERS
        .iter()
        .any(|marker| cause.contains(marker))
}

/// Text of a panic payload.
pub fn describe(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<std::io::Error>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<hyper::Error>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        e.to_string()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Description of the transport-level cause when the payload is a network
/// I/O error, including every error in its source chain.
///
/// Plain string panics are never treated as transport faults, even if the
/// text mentions a broken pipe.
fn network_cause(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(e) = payload.downcast_ref::<std::io::Error>() {
        Some(chain(e))
    } else if let Some(e) = payload.downcast_ref::<hyper::Error>() {
        Some(chain(e))
    } else if let Some(e) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        // Only boxed errors that wrap an io::Error somewhere in the chain.
        let root: &(dyn StdError + 'static) = &**e;
        let mut cur = Some(root);
        while let Some(err) = cur {
            if err.is::<std::io::Error>() {
                return Some(chain(root));
            }
            cur = err.source();
        }
        None
    } else {
        None
    }
}

fn chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(cause) = cur {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        cur = cause.source();
    }
    out
}
