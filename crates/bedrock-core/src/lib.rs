//! Lifecycle coordination for modular services.
//!
//! The [`Bedrock`] coordinator drives startup in a fixed, single-threaded
//! order: every [`Module`] in the caller-supplied list gets one `load` call
//! to contribute flag definitions (and optionally claim the introspection
//! [`Console`] slot), only then is the argument vector parsed, and only after
//! a clean parse does the console start. A termination-signal cleanup thread
//! tears the console down again when the process is asked to exit.
//!
//! Modules never depend on each other's implementation; everything they need
//! is reachable through the [`LoadContext`] handle the coordinator passes to
//! `load`.
//!
//! # Example
//!
//! ```
//! use bedrock_core::{Bedrock, LoadContext, Module, ModuleError, StartOutcome};
//! use bedrock_flags::FlagDefinition;
//!
//! struct Greeter;
//!
//! impl Module for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
//!         ctx.flags().register(FlagDefinition::text("greeting", "hello"))?;
//!         Ok(())
//!     }
//! }
//!
//! let argv = vec!["--greeting=howdy".to_owned()];
//! let mut base = Bedrock::new(argv, vec![Box::new(Greeter)]);
//! let outcome = base.start_with(&mut Vec::new()).expect("startup succeeds");
//! assert_eq!(outcome, StartOutcome::Running);
//! assert_eq!(base.flags().text("greeting"), Some("howdy"));
//! ```

pub mod console;
pub mod coordinator;
pub mod module;
pub mod phase;
pub mod shutdown;

pub use self::console::Console;
pub use self::coordinator::{Bedrock, StartOutcome, StartupError};
pub use self::module::{ConsoleClaimError, LoadContext, Module, ModuleError};
pub use self::phase::{Phase, PhaseError};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
