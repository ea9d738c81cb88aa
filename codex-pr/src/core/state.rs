//! Run phase state machine.
//!
//! `Idle → Validating → Invoking → (NoChanges | Publishing → OpeningPr) → Done`,
//! with `Failed` reachable from any non-terminal phase.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Validating,
    Invoking,
    NoChanges,
    Publishing,
    OpeningPr,
    Done,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::{Done, Failed, Idle, Invoking, NoChanges, OpeningPr, Publishing, Validating};
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Validating)
            | (Validating, Invoking)
            | (Invoking, NoChanges)
            | (Invoking, Publishing)
            | (Publishing, OpeningPr)
            | (NoChanges, Done)
            | (OpeningPr, Done) => true,
            _ => false,
        }
    }

    /// Return `next` if the transition is legal.
    pub fn advance(self, next: RunPhase) -> Result<RunPhase, String> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(format!("illegal run phase transition {self} -> {next}"))
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Invoking => "invoking",
            Self::NoChanges => "no-changes",
            Self::Publishing => "publishing",
            Self::OpeningPr => "opening-pr",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_paths_are_legal() {
        let with_changes = [
            RunPhase::Validating,
            RunPhase::Invoking,
            RunPhase::Publishing,
            RunPhase::OpeningPr,
            RunPhase::Done,
        ];
        let mut phase = RunPhase::Idle;
        for next in with_changes {
            phase = phase.advance(next).expect("legal");
        }
        assert!(phase.is_terminal());

        let mut phase = RunPhase::Invoking;
        for next in [RunPhase::NoChanges, RunPhase::Done] {
            phase = phase.advance(next).expect("legal");
        }
        assert_eq!(phase, RunPhase::Done);
    }

    #[test]
    fn skipping_phases_is_rejected() {
        assert!(RunPhase::Idle.advance(RunPhase::Invoking).is_err());
        assert!(RunPhase::Invoking.advance(RunPhase::OpeningPr).is_err());
        assert!(RunPhase::NoChanges.advance(RunPhase::Publishing).is_err());
    }

    #[test]
    fn terminal_phases_cannot_fail_again() {
        assert!(RunPhase::Publishing.can_advance_to(RunPhase::Failed));
        assert!(!RunPhase::Done.can_advance_to(RunPhase::Failed));
        assert!(!RunPhase::Failed.can_advance_to(RunPhase::Failed));
    }
}
