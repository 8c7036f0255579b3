//! Declarative command line flags with secret indirection.
//!
//! Service modules contribute [`FlagDefinition`]s to a shared
//! [`FlagRegistry`] before any parsing happens; only once every module has
//! registered does the owner call [`FlagRegistry::parse`]. The parser accepts
//! `--name=value` and `--name value` forms, lets switch flags appear bare,
//! and resolves raw values of the form `secret:<scheme>://<location>` through
//! pluggable [`SecretResolver`]s before type coercion.
//!
//! Parsing is all-or-nothing: unknown names, coercion failures, and secret
//! resolution failures abort the call before any staged value is applied to
//! the registry.
//!
//! # Example
//!
//! ```
//! use bedrock_flags::{FlagDefinition, FlagRegistry, ParseOutcome};
//!
//! let mut flags = FlagRegistry::new("demo", "1.0.0");
//! flags
//!     .register(FlagDefinition::text("greeting", "hello"))
//!     .expect("fresh name");
//! let outcome = flags.parse(&["--greeting=howdy"]).expect("parse succeeds");
//! assert_eq!(outcome, ParseOutcome::Applied);
//! assert_eq!(flags.text("greeting"), Some("howdy"));
//! ```

pub mod definition;
pub mod error;
pub mod registry;
pub mod secret;

pub use self::definition::{FlagDefinition, FlagKind, FlagValue};
pub use self::error::FlagError;
pub use self::registry::{FlagRegistry, HELP_FLAG, ParseOutcome, VERSION_FLAG};
pub use self::secret::{
    ResolverSet, SECRET_PREFIX, SecretFetchError, SecretReference, SecretReferenceError,
    SecretResolver,
};
