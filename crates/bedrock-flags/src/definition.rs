//! Flag definitions and their typed values.
//!
//! A [`FlagDefinition`] pairs a process-wide unique name with a semantic kind
//! and a default value. Definitions are constructed through the typed
//! builders ([`FlagDefinition::text`], [`FlagDefinition::integer`],
//! [`FlagDefinition::switch`]), so a definition's kind always matches its
//! default and the registry never has to reconcile the two.

use std::fmt;

use strum::{Display, EnumString};

use crate::error::FlagError;

/// Semantic type of a flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FlagKind {
    /// Free-form string value.
    Text,
    /// Signed 64-bit integer value.
    Integer,
    /// Boolean value; accepts a bare `--name` as implicit true.
    Switch,
}

/// A typed flag value, either a declared default or a parsed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// A string value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Switch(bool),
}

impl FlagValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> FlagKind {
        match self {
            Self::Text(_) => FlagKind::Text,
            Self::Integer(_) => FlagKind::Integer,
            Self::Switch(_) => FlagKind::Switch,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => formatter.write_str(value),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Switch(value) => write!(formatter, "{value}"),
        }
    }
}

/// Declaration of a single command line flag.
///
/// Owned by the [`crate::FlagRegistry`] once registered; modules hand
/// definitions over and read parsed values back through the registry's typed
/// getters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDefinition {
    name: String,
    default: FlagValue,
    description: Option<String>,
}

impl FlagDefinition {
    /// Declares a text flag.
    #[must_use]
    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: FlagValue::Text(default.into()),
            description: None,
        }
    }

    /// Declares an integer flag.
    #[must_use]
    pub fn integer(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            default: FlagValue::Integer(default),
            description: None,
        }
    }

    /// Declares a switch flag.
    #[must_use]
    pub fn switch(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            default: FlagValue::Switch(default),
            description: None,
        }
    }

    /// Attaches a usage description shown by `--help`.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Flag name, without the leading `--`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semantic kind of the flag.
    #[must_use]
    pub const fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    /// Value used when the argument vector omits the flag.
    #[must_use]
    pub const fn default_value(&self) -> &FlagValue {
        &self.default
    }

    /// Usage description, when one was supplied.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Rejects names that could not round-trip through the parser.
    pub(crate) fn validate(&self) -> Result<(), FlagError> {
        let name = self.name.as_str();
        if name.is_empty() {
            return Err(FlagError::InvalidDefinition {
                message: "flag name must not be empty".to_owned(),
            });
        }
        if name.starts_with('-') {
            return Err(FlagError::InvalidDefinition {
                message: format!("flag name '{name}' must not start with '-'"),
            });
        }
        if name.contains(['=', ' ', '\t', '\n']) {
            return Err(FlagError::InvalidDefinition {
                message: format!("flag name '{name}' must not contain '=' or whitespace"),
            });
        }
        Ok(())
    }

    /// Coerces a (possibly secret-resolved) raw token into a typed value.
    pub(crate) fn coerce(&self, raw: &str) -> Result<FlagValue, FlagError> {
        let invalid = || FlagError::InvalidValue {
            name: self.name.clone(),
            kind: self.kind(),
            value: raw.to_owned(),
        };
        match self.kind() {
            FlagKind::Text => Ok(FlagValue::Text(raw.to_owned())),
            FlagKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FlagValue::Integer)
                .map_err(|_| invalid()),
            FlagKind::Switch => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(FlagValue::Switch(true)),
                "false" => Ok(FlagValue::Switch(false)),
                _ => Err(invalid()),
            },
        }
    }
}
