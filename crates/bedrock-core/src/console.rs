//! Contract between the coordinator and a console implementation.
//!
//! The coordinator consumes the console through this three-operation trait
//! only; routing, widget mounting, and health checks are the implementation's
//! business. Keeping the seam this narrow is what lets the core avoid a
//! dependency on any HTTP stack.

use std::io;

use bedrock_flags::FlagRegistry;

/// Optional introspection endpoint claimed by at most one module.
///
/// Implementations receive the parsed flag registry at start time because
/// the coordinator owns configuration; there is no global state to read it
/// from.
#[cfg_attr(test, mockall::automock)]
pub trait Console: Send + Sync {
    /// Binds and begins serving, or does nothing when the console is
    /// disabled by configuration.
    ///
    /// # Errors
    ///
    /// Returns the bind or spawn fault; the coordinator treats any error
    /// here as fatal to startup.
    fn start(&self, flags: &FlagRegistry) -> io::Result<()>;

    /// Stops serving and releases the socket. Must be idempotent; the
    /// termination cleanup may race an explicit teardown.
    ///
    /// # Errors
    ///
    /// Returns the teardown fault; callers on the shutdown path log it and
    /// continue.
    fn shutdown(&self) -> io::Result<()>;

    /// Bound port, `Some` only after a successful binding [`Console::start`].
    fn port(&self) -> Option<u16>;
}
