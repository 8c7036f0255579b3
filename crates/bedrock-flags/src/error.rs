//! Domain errors raised by flag registration and parsing.
//!
//! Registration and parse faults are structured `thiserror` variants so the
//! coordinator can report them precisely. Secret store failures are the one
//! exception: they pass through as the resolver's native boxed error so
//! callers can still downcast to the store's own type.

use thiserror::Error;

use crate::definition::FlagKind;
use crate::secret::{SecretFetchError, SecretReferenceError};

/// Errors arising from flag registration and parsing.
#[derive(Debug, Error)]
pub enum FlagError {
    /// A definition with the same name is already registered.
    #[error("flag '{name}' is already registered")]
    DuplicateFlag {
        /// Name of the colliding flag.
        name: String,
    },

    /// The definition itself is unusable.
    #[error("invalid flag definition: {message}")]
    InvalidDefinition {
        /// Description of the validation failure.
        message: String,
    },

    /// The argument vector named a flag nobody registered.
    #[error("unknown flag '--{name}'")]
    UnknownFlag {
        /// Name as it appeared in the argument vector.
        name: String,
    },

    /// A token was not a `--name` flag at all.
    #[error("unexpected argument '{token}'")]
    UnexpectedArgument {
        /// Offending token.
        token: String,
    },

    /// A non-switch flag appeared without a value.
    #[error("flag '--{name}' expects a {kind} value but none was supplied")]
    MissingValue {
        /// Name of the flag missing its value.
        name: String,
        /// Declared kind of the flag.
        kind: FlagKind,
    },

    /// A raw value failed type coercion.
    #[error("flag '--{name}' expects a {kind} value, got '{value}'")]
    InvalidValue {
        /// Name of the offending flag.
        name: String,
        /// Declared kind of the flag.
        kind: FlagKind,
        /// Raw value after any secret resolution.
        value: String,
    },

    /// A value carried the `secret:` prefix but did not parse as a reference.
    #[error(transparent)]
    MalformedSecretReference(#[from] SecretReferenceError),

    /// No resolver is registered for the reference's scheme.
    #[error("unsupported secret scheme '{scheme}'")]
    UnsupportedScheme {
        /// Scheme named by the reference.
        scheme: String,
    },

    /// A resolver is already registered for the scheme.
    #[error("secret resolver for scheme '{scheme}' is already registered")]
    DuplicateResolver {
        /// Scheme of the colliding resolver.
        scheme: String,
    },

    /// The secret store failed; the native error passes through unaltered
    /// as the source so callers can still downcast it.
    #[error("secret fetch failed")]
    SecretFetch(#[source] SecretFetchError),
}
