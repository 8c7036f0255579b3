//! Secret indirection for flag values.
//!
//! A raw flag value of the form `secret:<scheme>://<location>` is not used
//! directly; the scheme selects a registered [`SecretResolver`] which fetches
//! the real value from an external store at parse time. The location part is
//! opaque to this crate. Values without the `secret:` prefix are never
//! resolved, however URI-shaped they look.
//!
//! Resolver failures are passed through unaltered so infrastructure problems
//! (missing objects, bad credentials) stay visible and downcastable at the
//! call site.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::FlagError;

/// Prefix marking a flag value as a secret reference.
pub const SECRET_PREFIX: &str = "secret:";

/// Error type produced by [`SecretResolver`] implementations.
pub type SecretFetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors encountered while parsing a [`SecretReference`] from a raw value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretReferenceError {
    /// The value carried the `secret:` prefix but no `://` separator.
    #[error("secret reference '{0}' is missing the scheme separator '://'")]
    MissingSeparator(String),
    /// The scheme part was empty.
    #[error("secret reference '{0}' has an empty scheme")]
    EmptyScheme(String),
    /// The location part was empty.
    #[error("secret reference '{0}' has an empty location")]
    EmptyLocation(String),
    /// The value did not carry the `secret:` prefix at all.
    #[error("'{0}' is not a secret reference")]
    NotAReference(String),
}

/// A parsed `secret:<scheme>://<location>` flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    scheme: String,
    location: String,
}

impl SecretReference {
    /// Inspects a raw flag value for secret indirection.
    ///
    /// Returns `Ok(None)` for ordinary values without the `secret:` prefix,
    /// including ones that merely look like URIs.
    ///
    /// # Errors
    ///
    /// Returns a [`SecretReferenceError`] when the prefix is present but the
    /// remainder does not parse as `<scheme>://<location>`.
    pub fn detect(raw: &str) -> Result<Option<Self>, SecretReferenceError> {
        let Some(remainder) = raw.strip_prefix(SECRET_PREFIX) else {
            return Ok(None);
        };
        let (scheme, location) = remainder
            .split_once("://")
            .ok_or_else(|| SecretReferenceError::MissingSeparator(raw.to_owned()))?;
        if scheme.is_empty() {
            return Err(SecretReferenceError::EmptyScheme(raw.to_owned()));
        }
        if location.is_empty() {
            return Err(SecretReferenceError::EmptyLocation(raw.to_owned()));
        }
        Ok(Some(Self {
            scheme: scheme.to_owned(),
            location: location.to_owned(),
        }))
    }

    /// Scheme selecting the resolver, e.g. `s3`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Store-specific location, opaque to the flag layer.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{SECRET_PREFIX}{}://{}",
            self.scheme, self.location
        )
    }
}

impl FromStr for SecretReference {
    type Err = SecretReferenceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::detect(input)?.ok_or_else(|| SecretReferenceError::NotAReference(input.to_owned()))
    }
}

/// Pluggable lookup for one secret scheme.
///
/// Implementations fetch the raw content stored at `location` and surface
/// their store's native error on failure; the flag layer never rewrites or
/// downgrades it.
pub trait SecretResolver: Send + Sync {
    /// Scheme this resolver serves, e.g. `s3`.
    fn scheme(&self) -> &str;

    /// Fetches the content stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns the store's native error when the fetch fails.
    fn resolve(&self, location: &str) -> Result<String, SecretFetchError>;
}

/// Resolver dispatch table keyed by scheme.
#[derive(Default)]
pub struct ResolverSet {
    resolvers: HashMap<String, Box<dyn SecretResolver>>,
}

impl ResolverSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver under its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::DuplicateResolver`] if the scheme is taken.
    pub fn register(&mut self, resolver: Box<dyn SecretResolver>) -> Result<(), FlagError> {
        let scheme = resolver.scheme().to_owned();
        if self.resolvers.contains_key(&scheme) {
            return Err(FlagError::DuplicateResolver { scheme });
        }
        self.resolvers.insert(scheme, resolver);
        Ok(())
    }

    /// Dispatches a reference to the resolver registered for its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::UnsupportedScheme`] when no resolver is
    /// registered for the scheme, or [`FlagError::SecretFetch`] carrying the
    /// resolver's native error unaltered.
    pub fn resolve(&self, reference: &SecretReference) -> Result<String, FlagError> {
        let resolver =
            self.resolvers
                .get(reference.scheme())
                .ok_or_else(|| FlagError::UnsupportedScheme {
                    scheme: reference.scheme().to_owned(),
                })?;
        resolver
            .resolve(reference.location())
            .map_err(FlagError::SecretFetch)
    }

    /// Reports whether a resolver is registered for `scheme`.
    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.resolvers.contains_key(scheme)
    }
}

impl fmt::Debug for ResolverSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        formatter
            .debug_struct("ResolverSet")
            .field("schemes", &schemes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver {
        scheme: &'static str,
        value: &'static str,
    }

    impl SecretResolver for StaticResolver {
        fn scheme(&self) -> &str {
            self.scheme
        }

        fn resolve(&self, _location: &str) -> Result<String, SecretFetchError> {
            Ok(self.value.to_owned())
        }
    }

    #[test]
    fn detects_references() {
        let reference = SecretReference::detect("secret:s3://bucket/path/file")
            .expect("well formed")
            .expect("prefixed");
        assert_eq!(reference.scheme(), "s3");
        assert_eq!(reference.location(), "bucket/path/file");
        assert_eq!(reference.to_string(), "secret:s3://bucket/path/file");
    }

    #[test]
    fn uri_shaped_values_without_prefix_are_not_references() {
        assert_eq!(SecretReference::detect("s3://bucket/file"), Ok(None));
        assert_eq!(SecretReference::detect("plain"), Ok(None));
    }

    #[test]
    fn rejects_malformed_references() {
        assert!(matches!(
            SecretReference::detect("secret:s3:/bucket"),
            Err(SecretReferenceError::MissingSeparator(_))
        ));
        assert!(matches!(
            SecretReference::detect("secret://bucket/file"),
            Err(SecretReferenceError::EmptyScheme(_))
        ));
        assert!(matches!(
            SecretReference::detect("secret:s3://"),
            Err(SecretReferenceError::EmptyLocation(_))
        ));
    }

    #[test]
    fn from_str_requires_the_prefix() {
        assert!("secret:env://HOME".parse::<SecretReference>().is_ok());
        assert!(matches!(
            "env://HOME".parse::<SecretReference>(),
            Err(SecretReferenceError::NotAReference(_))
        ));
    }

    #[test]
    fn dispatches_by_scheme() {
        let mut set = ResolverSet::new();
        set.register(Box::new(StaticResolver {
            scheme: "mem",
            value: "v",
        }))
        .expect("fresh scheme");
        let reference = "secret:mem://anything"
            .parse::<SecretReference>()
            .expect("reference");
        assert_eq!(set.resolve(&reference).expect("resolved"), "v");
    }

    #[test]
    fn rejects_duplicate_scheme() {
        let mut set = ResolverSet::new();
        set.register(Box::new(StaticResolver {
            scheme: "mem",
            value: "a",
        }))
        .expect("first registration");
        let error = set
            .register(Box::new(StaticResolver {
                scheme: "mem",
                value: "b",
            }))
            .expect_err("duplicate scheme");
        assert!(matches!(error, FlagError::DuplicateResolver { .. }));
    }

    #[test]
    fn unknown_scheme_is_unsupported() {
        let set = ResolverSet::new();
        let reference = "secret:s3://bucket/file"
            .parse::<SecretReference>()
            .expect("reference");
        assert!(matches!(
            set.resolve(&reference),
            Err(FlagError::UnsupportedScheme { .. })
        ));
    }
}
