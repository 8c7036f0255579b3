//! The lifecycle coordinator.
//!
//! [`Bedrock`] owns the startup sequence: feed every module its handle, parse
//! the argument vector, handle help/version, start the console when one was
//! claimed, and register the termination cleanup. Startup is strictly
//! single-threaded; the only concurrency in this crate is the cleanup thread,
//! which touches nothing but the immutable console binding.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::thread;

use bedrock_flags::{FlagError, FlagRegistry, ParseOutcome};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::console::Console;
use crate::module::{LoadContext, Module, ModuleError};
use crate::phase::{Phase, PhaseError};
use crate::shutdown::{ShutdownSignal, SystemShutdownSignal};

const COORDINATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::coordinator");

/// Result of a successful startup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Startup completed; the coordinator reached [`Phase::Running`].
    Running,
    /// `--help` was requested; usage text was written, nothing started.
    HelpPrinted,
    /// `--version` was requested; version text was written, nothing started.
    VersionPrinted,
}

/// Errors that abort startup.
///
/// Every variant is fatal: the coordinator performs no retries and leaves no
/// partially started state behind.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A module's `load` hook failed; nothing after it ran.
    #[error("module '{name}' failed to load: {source}")]
    Module {
        /// Name of the failing module.
        name: String,
        /// Fault raised by the module.
        #[source]
        source: ModuleError,
    },

    /// The argument vector did not parse.
    #[error("failed to parse command line flags: {source}")]
    Parse {
        /// Underlying flag error.
        #[from]
        source: FlagError,
    },

    /// The bound console failed to start.
    #[error("could not start console: {source}")]
    Console {
        /// Bind or spawn fault reported by the console.
        #[source]
        source: io::Error,
    },

    /// Usage or version text could not be written.
    #[error("failed to write startup output: {source}")]
    Output {
        /// Fault from the output stream.
        #[source]
        source: io::Error,
    },

    /// Startup was attempted more than once on the same coordinator.
    #[error("startup already ran (coordinator is in phase {phase})")]
    AlreadyStarted {
        /// Phase the coordinator was found in.
        phase: Phase,
    },

    /// Internal phase bookkeeping rejected a transition.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

/// Lifecycle coordinator for modular services.
///
/// Constructed with an argument vector and an explicit, ordered module list;
/// there is no ambient module discovery, so load order is exactly list
/// order.
pub struct Bedrock {
    argv: Vec<String>,
    flags: FlagRegistry,
    modules: Vec<Box<dyn Module>>,
    console: Option<Arc<dyn Console>>,
    phase: Phase,
    shutdown_signal: Option<Box<dyn ShutdownSignal>>,
    cleanup: Option<thread::JoinHandle<()>>,
}

impl Bedrock {
    /// Creates a coordinator with a default flag registry.
    #[must_use]
    pub fn new(argv: Vec<String>, modules: Vec<Box<dyn Module>>) -> Self {
        Self::with_flags(argv, modules, FlagRegistry::default())
    }

    /// Creates a coordinator with a pre-seeded flag registry.
    ///
    /// Use this to set the program identity reported by `--help` and
    /// `--version`, or to register flags and secret resolvers up front.
    #[must_use]
    pub fn with_flags(
        argv: Vec<String>,
        modules: Vec<Box<dyn Module>>,
        flags: FlagRegistry,
    ) -> Self {
        Self {
            argv,
            flags,
            modules,
            console: None,
            phase: Phase::Created,
            shutdown_signal: Some(Box::new(SystemShutdownSignal::new())),
            cleanup: None,
        }
    }

    /// Replaces the termination-signal source, mainly for tests and
    /// embedders with their own signal handling.
    #[must_use]
    pub fn with_shutdown_signal(mut self, signal: Box<dyn ShutdownSignal>) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    /// Drives startup, writing any help or version text to `out`.
    ///
    /// The sequence is fixed: every module's `load` runs once, in order;
    /// then the argument vector is parsed; help/version short-circuit into a
    /// terminal phase; otherwise the console (when claimed) is started, the
    /// termination cleanup is registered, and the coordinator reaches
    /// [`Phase::Running`].
    ///
    /// # Errors
    ///
    /// Fails on the first module-load fault, on any parse fault, or when the
    /// console cannot start. All are fatal; nothing is retried.
    pub fn start_with<W: Write>(&mut self, out: &mut W) -> Result<StartOutcome, StartupError> {
        if self.phase != Phase::Created {
            return Err(StartupError::AlreadyStarted { phase: self.phase });
        }
        self.load_modules()?;
        self.phase.advance(Phase::ModulesLoaded)?;

        let outcome = self.flags.parse(&self.argv)?;
        self.phase.advance(Phase::Parsed)?;

        match outcome {
            ParseOutcome::HelpRequested => {
                self.flags
                    .write_usage(out)
                    .map_err(|source| StartupError::Output { source })?;
                self.phase.advance(Phase::HelpOrVersion)?;
                return Ok(StartOutcome::HelpPrinted);
            }
            ParseOutcome::VersionRequested => {
                self.flags
                    .write_version(out)
                    .map_err(|source| StartupError::Output { source })?;
                self.phase.advance(Phase::HelpOrVersion)?;
                return Ok(StartOutcome::VersionPrinted);
            }
            ParseOutcome::Applied => {}
        }

        if let Some(console) = &self.console {
            console
                .start(&self.flags)
                .map_err(|source| StartupError::Console { source })?;
            info!(
                target: COORDINATOR_TARGET,
                port = console.port(),
                "console started"
            );
        }
        self.spawn_cleanup();
        self.phase.advance(Phase::Started)?;
        self.phase.advance(Phase::Running)?;
        info!(target: COORDINATOR_TARGET, "startup complete");
        Ok(StartOutcome::Running)
    }

    /// Drives startup against standard output and honours the process exit
    /// contract: help/version terminate the process with status 0.
    ///
    /// # Errors
    ///
    /// Propagates every [`StartupError`] from [`Bedrock::start_with`].
    pub fn run(&mut self) -> Result<(), StartupError> {
        match self.start_with(&mut io::stdout())? {
            StartOutcome::Running => Ok(()),
            StartOutcome::HelpPrinted | StartOutcome::VersionPrinted => process::exit(0),
        }
    }

    /// Explicit teardown: stops the console (faults are logged, never
    /// propagated) and moves to [`Phase::Terminated`]. Idempotent; a no-op
    /// once the coordinator is in a terminal phase.
    pub fn shutdown(&mut self) {
        if self.phase.advance(Phase::ShuttingDown).is_err() {
            return;
        }
        if let Some(console) = &self.console {
            match console.shutdown() {
                Ok(()) => info!(target: COORDINATOR_TARGET, "console stopped"),
                Err(fault) => warn!(
                    target: COORDINATOR_TARGET,
                    error = %fault,
                    "could not shut down console"
                ),
            }
        }
        self.phase.advance(Phase::Terminated).ok();
    }

    /// Blocks until the termination cleanup has run, then records the final
    /// phase transitions. Only meaningful after a [`StartOutcome::Running`]
    /// startup.
    pub fn wait_for_termination(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            if handle.join().is_err() {
                warn!(target: COORDINATOR_TARGET, "cleanup thread panicked");
            }
        }
        if self.phase.advance(Phase::ShuttingDown).is_ok() {
            self.phase.advance(Phase::Terminated).ok();
        }
    }

    /// The flag registry, for reading parsed values.
    #[must_use]
    pub const fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Port of the bound console, when one is claimed and started.
    #[must_use]
    pub fn console_port(&self) -> Option<u16> {
        self.console.as_ref().and_then(|console| console.port())
    }

    fn load_modules(&mut self) -> Result<(), StartupError> {
        let mut modules = std::mem::take(&mut self.modules);
        let result = modules.iter_mut().try_for_each(|module| {
            let mut ctx = LoadContext::new(&mut self.flags, &mut self.console);
            module.load(&mut ctx).map_err(|source| StartupError::Module {
                name: module.name().to_owned(),
                source,
            })?;
            info!(
                target: COORDINATOR_TARGET,
                module = module.name(),
                "module loaded"
            );
            Ok(())
        });
        self.modules = modules;
        result
    }

    /// Registers the termination cleanup exactly once. The thread owns a
    /// clone of the console binding, which is set and immutable by now; no
    /// writer races it.
    fn spawn_cleanup(&mut self) {
        let Some(signal) = self.shutdown_signal.take() else {
            return;
        };
        let console = self.console.clone();
        let spawned = thread::Builder::new()
            .name("bedrock-cleanup".to_owned())
            .spawn(move || {
                if let Err(fault) = signal.wait() {
                    error!(
                        target: COORDINATOR_TARGET,
                        error = %fault,
                        "termination listener failed; cleanup disabled"
                    );
                    return;
                }
                let Some(console) = console else {
                    return;
                };
                // The process is already exiting; teardown faults are
                // diagnostics, not errors.
                match console.shutdown() {
                    Ok(()) => info!(target: COORDINATOR_TARGET, "console stopped"),
                    Err(fault) => warn!(
                        target: COORDINATOR_TARGET,
                        error = %fault,
                        "could not shut down console"
                    ),
                }
            });
        match spawned {
            Ok(handle) => self.cleanup = Some(handle),
            Err(fault) => warn!(
                target: COORDINATOR_TARGET,
                error = %fault,
                "could not spawn cleanup thread"
            ),
        }
    }
}

#[cfg(test)]
mod tests;
