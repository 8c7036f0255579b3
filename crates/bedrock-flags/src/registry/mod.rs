//! Flag registry and argument vector parser.
//!
//! The [`FlagRegistry`] owns every registered [`FlagDefinition`] and rejects
//! duplicate names at registration time, before parsing ever begins. Parsing
//! stages all recognised values first and commits them only when the whole
//! argument vector resolved and coerced cleanly, so a failing call leaves the
//! registry exactly as it was.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::definition::{FlagDefinition, FlagKind, FlagValue};
use crate::error::FlagError;
use crate::secret::{ResolverSet, SecretReference, SecretResolver};

/// Reserved flag that prints usage and terminates startup.
pub const HELP_FLAG: &str = "help";

/// Reserved flag that prints the program version and terminates startup.
pub const VERSION_FLAG: &str = "version";

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Result of a successful [`FlagRegistry::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every recognised value was applied to the registry.
    Applied,
    /// `--help` was present; nothing was applied.
    HelpRequested,
    /// `--version` was present; nothing was applied.
    VersionRequested,
}

/// Registry of flag definitions, parsed values, and secret resolvers.
///
/// # Example
///
/// ```
/// use bedrock_flags::{FlagDefinition, FlagRegistry};
///
/// let mut flags = FlagRegistry::new("svc", "1.2.3");
/// flags
///     .register(FlagDefinition::integer("port", 8080))
///     .expect("fresh name");
/// flags.parse(&["--port", "9090"]).expect("parse succeeds");
/// assert_eq!(flags.integer("port"), Some(9090));
/// ```
#[derive(Debug)]
pub struct FlagRegistry {
    definitions: BTreeMap<String, FlagDefinition>,
    values: BTreeMap<String, FlagValue>,
    resolvers: ResolverSet,
    program: String,
    version: String,
}

impl FlagRegistry {
    /// Creates an empty registry identified by program name and version in
    /// usage and version output.
    #[must_use]
    pub fn new(program: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            definitions: BTreeMap::new(),
            values: BTreeMap::new(),
            resolvers: ResolverSet::new(),
            program: program.into(),
            version: version.into(),
        }
    }

    /// Registers a flag definition.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::DuplicateFlag`] when the name is already present
    /// or reserved, and [`FlagError::InvalidDefinition`] when the name could
    /// not round-trip through the parser.
    pub fn register(&mut self, definition: FlagDefinition) -> Result<(), FlagError> {
        definition.validate()?;
        let name = definition.name().to_owned();
        if name == HELP_FLAG || name == VERSION_FLAG || self.definitions.contains_key(&name) {
            return Err(FlagError::DuplicateFlag { name });
        }
        tracing::debug!(
            target: REGISTRY_TARGET,
            flag = %name,
            kind = %definition.kind(),
            "flag registered"
        );
        self.definitions.insert(name, definition);
        Ok(())
    }

    /// Registers a secret resolver under its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::DuplicateResolver`] when the scheme is taken.
    pub fn add_resolver(&mut self, resolver: Box<dyn SecretResolver>) -> Result<(), FlagError> {
        self.resolvers.register(resolver)
    }

    /// Parses an argument vector against the registered definitions.
    ///
    /// Accepts `--name=value` and `--name value`; switch flags may appear
    /// bare. Raw values using secret indirection are resolved exactly once,
    /// here, before coercion. A `--help` or `--version` anywhere in the
    /// vector short-circuits before any resolution or application.
    ///
    /// # Errors
    ///
    /// Fails on unknown flags, missing or uncoercible values, malformed
    /// secret references, unsupported schemes, and resolver faults. No staged
    /// value is applied when any token fails.
    pub fn parse<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<ParseOutcome, FlagError> {
        if let Some(outcome) = Self::short_circuit(argv) {
            return Ok(outcome);
        }
        let staged = self.stage(argv)?;
        let applied = staged.len();
        for (name, value) in staged {
            self.values.insert(name, value);
        }
        tracing::debug!(target: REGISTRY_TARGET, applied, "argument vector applied");
        Ok(ParseOutcome::Applied)
    }

    /// Effective value of a flag: the parsed one, or the declared default.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.values
            .get(name)
            .or_else(|| self.definitions.get(name).map(FlagDefinition::default_value))
    }

    /// Effective text value of a registered text flag.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.value(name) {
            Some(FlagValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Effective value of a registered integer flag.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.value(name) {
            Some(FlagValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Effective value of a registered switch flag.
    #[must_use]
    pub fn switch(&self, name: &str) -> Option<bool> {
        match self.value(name) {
            Some(FlagValue::Switch(value)) => Some(*value),
            _ => None,
        }
    }

    /// Reports whether a parsed argument vector supplied the flag.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Reports whether a definition with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Writes usage text: one row per definition plus the reserved rows.
    ///
    /// # Errors
    ///
    /// Propagates faults from the output stream.
    pub fn write_usage<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Usage: {} [flags]", self.program)?;
        writeln!(out)?;
        writeln!(out, "Flags:")?;
        for definition in self.definitions.values() {
            let header = format!("--{} <{}>", definition.name(), definition.kind());
            let default = definition.default_value();
            match definition.description() {
                Some(description) => {
                    writeln!(out, "  {header:<32} {description} (default: {default})")?;
                }
                None => writeln!(out, "  {header:<32} (default: {default})")?,
            }
        }
        writeln!(out, "  {:<32} print this usage text and exit", "--help")?;
        writeln!(out, "  {:<32} print the version and exit", "--version")?;
        Ok(())
    }

    /// Writes the program name and version.
    ///
    /// # Errors
    ///
    /// Propagates faults from the output stream.
    pub fn write_version<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{} {}", self.program, self.version)
    }

    fn short_circuit<S: AsRef<str>>(argv: &[S]) -> Option<ParseOutcome> {
        let mut version_requested = false;
        for token in argv {
            let Some(body) = token.as_ref().strip_prefix("--") else {
                continue;
            };
            let name = body.split_once('=').map_or(body, |(prefix, _)| prefix);
            if name == HELP_FLAG {
                return Some(ParseOutcome::HelpRequested);
            }
            if name == VERSION_FLAG {
                version_requested = true;
            }
        }
        version_requested.then_some(ParseOutcome::VersionRequested)
    }

    fn stage<S: AsRef<str>>(&self, argv: &[S]) -> Result<Vec<(String, FlagValue)>, FlagError> {
        let mut staged = Vec::new();
        let mut tokens = argv.iter().map(AsRef::as_ref).peekable();
        while let Some(token) = tokens.next() {
            let Some(body) = token.strip_prefix("--") else {
                return Err(FlagError::UnexpectedArgument {
                    token: token.to_owned(),
                });
            };
            let (name, inline) = match body.split_once('=') {
                Some((prefix, value)) => (prefix, Some(value.to_owned())),
                None => (body, None),
            };
            let definition =
                self.definitions
                    .get(name)
                    .ok_or_else(|| FlagError::UnknownFlag {
                        name: name.to_owned(),
                    })?;
            let raw = match inline {
                Some(value) => value,
                None if tokens.peek().is_some_and(|next| !next.starts_with("--")) => {
                    tokens.next().map(str::to_owned).unwrap_or_default()
                }
                // Bare switch means implicit true.
                None if definition.kind() == FlagKind::Switch => "true".to_owned(),
                None => {
                    return Err(FlagError::MissingValue {
                        name: name.to_owned(),
                        kind: definition.kind(),
                    });
                }
            };
            let resolved = self.resolve_indirection(name, raw)?;
            staged.push((name.to_owned(), definition.coerce(&resolved)?));
        }
        Ok(staged)
    }

    fn resolve_indirection(&self, name: &str, raw: String) -> Result<String, FlagError> {
        match SecretReference::detect(&raw)? {
            Some(reference) => {
                tracing::debug!(
                    target: REGISTRY_TARGET,
                    flag = name,
                    scheme = reference.scheme(),
                    "resolving secret flag value"
                );
                self.resolvers.resolve(&reference)
            }
            None => Ok(raw),
        }
    }
}

impl Default for FlagRegistry {
    /// Registry with a placeholder identity, for callers that do not pre-seed
    /// one of their own.
    fn default() -> Self {
        Self::new("service", "0.0.0")
    }
}
