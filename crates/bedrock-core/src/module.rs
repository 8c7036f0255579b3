//! Module capability contract and the coordinator handle passed to it.
//!
//! A module is a unit of capability with exactly one lifecycle hook: `load`,
//! called once, synchronously, before flag parsing. Through the
//! [`LoadContext`] handle it may register flag definitions and claim the
//! write-once console slot; it has no identity beyond those side effects.

use std::sync::Arc;

use bedrock_flags::FlagRegistry;
use thiserror::Error;

use crate::console::Console;

/// Error type surfaced by a failing [`Module::load`].
pub type ModuleError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A capability unit loaded by the coordinator.
pub trait Module {
    /// Stable name used in startup diagnostics.
    fn name(&self) -> &str;

    /// Registers flags and optionally claims the console slot.
    ///
    /// Called exactly once per coordinator run, before parsing, in the order
    /// the caller listed the modules.
    ///
    /// # Errors
    ///
    /// Any error aborts the entire startup; no partial registration is
    /// tolerated.
    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError>;
}

/// The console slot was claimed a second time.
///
/// The slot is write-once; a second claim is rejected rather than silently
/// replacing the first binding.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("the console slot has already been claimed")]
pub struct ConsoleClaimError;

/// Handle the coordinator passes to each [`Module::load`] call.
///
/// Exposes the flag registry and the console slot; nothing else of the
/// coordinator leaks into modules.
pub struct LoadContext<'a> {
    flags: &'a mut FlagRegistry,
    console: &'a mut Option<Arc<dyn Console>>,
}

impl<'a> LoadContext<'a> {
    pub(crate) const fn new(
        flags: &'a mut FlagRegistry,
        console: &'a mut Option<Arc<dyn Console>>,
    ) -> Self {
        Self { flags, console }
    }

    /// Flag registry for contributing definitions and secret resolvers.
    pub const fn flags(&mut self) -> &mut FlagRegistry {
        self.flags
    }

    /// Claims the write-once console slot.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleClaimError`] when another module already claimed it.
    pub fn claim_console(&mut self, console: Arc<dyn Console>) -> Result<(), ConsoleClaimError> {
        if self.console.is_some() {
            return Err(ConsoleClaimError);
        }
        *self.console = Some(console);
        Ok(())
    }

    /// Reports whether some module has already claimed the console slot.
    #[must_use]
    pub const fn console_claimed(&self) -> bool {
        self.console.is_some()
    }
}
