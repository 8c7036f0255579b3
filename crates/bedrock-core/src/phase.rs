//! Startup and shutdown phase machine.
//!
//! Phases advance monotonically along the sequence in [`Phase`]; a
//! transition either follows a declared edge or is rejected. Help/version
//! handling branches off after parsing into a terminal phase, and shutdown
//! may cut in from any live phase.

use strum::Display;
use thiserror::Error;

/// Discrete step in the coordinator's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Coordinator constructed; nothing has run.
    Created,
    /// Every module's `load` hook has returned.
    ModulesLoaded,
    /// The argument vector has been parsed.
    Parsed,
    /// Help or version was requested; terminal, the console never starts.
    HelpOrVersion,
    /// The console (when bound) has started.
    Started,
    /// Startup finished; the service owns the process from here.
    Running,
    /// Teardown has begun.
    ShuttingDown,
    /// Teardown finished; terminal.
    Terminated,
}

impl Phase {
    /// Phases reachable in one transition.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Created => &[Self::ModulesLoaded, Self::ShuttingDown],
            Self::ModulesLoaded => &[Self::Parsed, Self::ShuttingDown],
            Self::Parsed => &[Self::HelpOrVersion, Self::Started, Self::ShuttingDown],
            Self::Started => &[Self::Running, Self::ShuttingDown],
            Self::Running => &[Self::ShuttingDown],
            Self::ShuttingDown => &[Self::Terminated],
            Self::HelpOrVersion | Self::Terminated => &[],
        }
    }

    /// Moves to `next` when the edge exists.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidTransition`] for backward, repeated, or
    /// skipping transitions.
    pub fn advance(&mut self, next: Self) -> Result<(), PhaseError> {
        if self.successors().contains(&next) {
            *self = next;
            return Ok(());
        }
        Err(PhaseError::InvalidTransition { from: *self, to: next })
    }

    /// Reports whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::HelpOrVersion | Self::Terminated)
    }
}

/// Errors raised by illegal phase transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseError {
    /// The requested transition does not follow a declared edge.
    #[error("illegal phase transition {from} -> {to}")]
    InvalidTransition {
        /// Phase the coordinator was in.
        from: Phase,
        /// Phase that was requested.
        to: Phase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_advances_in_order() {
        let mut phase = Phase::Created;
        for next in [
            Phase::ModulesLoaded,
            Phase::Parsed,
            Phase::Started,
            Phase::Running,
            Phase::ShuttingDown,
            Phase::Terminated,
        ] {
            phase.advance(next).expect("declared edge");
        }
        assert!(phase.is_terminal());
    }

    #[test]
    fn transitions_never_go_backward() {
        let mut phase = Phase::Parsed;
        let error = phase
            .advance(Phase::ModulesLoaded)
            .expect_err("backward transition");
        assert_eq!(
            error,
            PhaseError::InvalidTransition {
                from: Phase::Parsed,
                to: Phase::ModulesLoaded
            }
        );
        assert_eq!(phase, Phase::Parsed);
    }

    #[test]
    fn help_or_version_is_terminal() {
        let mut phase = Phase::Parsed;
        phase.advance(Phase::HelpOrVersion).expect("declared edge");
        assert!(phase.is_terminal());
        assert!(phase.advance(Phase::Started).is_err());
    }

    #[test]
    fn shutdown_cuts_in_from_live_phases() {
        for from in [Phase::Created, Phase::ModulesLoaded, Phase::Parsed, Phase::Running] {
            let mut phase = from;
            phase.advance(Phase::ShuttingDown).expect("shutdown edge");
            phase.advance(Phase::Terminated).expect("terminate edge");
        }
    }

    #[test]
    fn phases_render_snake_case() {
        assert_eq!(Phase::ModulesLoaded.to_string(), "modules_loaded");
        assert_eq!(Phase::HelpOrVersion.to_string(), "help_or_version");
    }
}
