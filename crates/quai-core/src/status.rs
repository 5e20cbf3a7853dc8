//! # Accreditation Lifecycle State Machine
//!
//! An accreditation moves through six statuses. Four of them
//! (`NOUVEAU`, `ATTENTE`, `REFUS`, `ABSENT`) are administrative and
//! freely interchangeable; the remaining two are tied to physical
//! presence on site and are one-way:
//!
//! ```text
//! NOUVEAU ⇄ ATTENTE ⇄ REFUS ⇄ ABSENT
//!        \        |        /
//!         v       v       v
//!              ENTREE ──> SORTIE (terminal)
//! ```
//!
//! Entering `ENTREE` starts the on-site timer (`entry_at`), entering
//! `SORTIE` stops it (`exit_at`); both timestamps are set exactly once
//! and never overwritten. Because the timer cannot be undone, entering
//! `ENTREE` requires an explicit confirmation flag from the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use thiserror::Error;

/// Lifecycle status of an accreditation. Wire spellings are the
/// uppercase French labels used since the first revision of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Status {
    /// Freshly entered by a logistician, not yet triaged.
    #[serde(rename = "NOUVEAU")]
    Nouveau,
    /// Submitted and waiting for gate entry. Default for public submissions.
    #[serde(rename = "ATTENTE")]
    Attente,
    /// Vehicle is on site. Only exit is possible from here.
    #[serde(rename = "ENTREE")]
    Entree,
    /// Vehicle has left the site. Terminal.
    #[serde(rename = "SORTIE")]
    Sortie,
    /// Request refused by a logistician.
    #[serde(rename = "REFUS")]
    Refus,
    /// Vehicle never showed up.
    #[serde(rename = "ABSENT")]
    Absent,
}

impl Status {
    /// All statuses, in display order.
    pub const ALL: [Status; 6] = [
        Status::Nouveau,
        Status::Attente,
        Status::Entree,
        Status::Sortie,
        Status::Refus,
        Status::Absent,
    ];

    /// Wire spelling (`"ATTENTE"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Nouveau => "NOUVEAU",
            Status::Attente => "ATTENTE",
            Status::Entree => "ENTREE",
            Status::Sortie => "SORTIE",
            Status::Refus => "REFUS",
            Status::Absent => "ABSENT",
        }
    }

    /// Human-readable French label, used in history descriptions and
    /// matched by the dashboard free-text search.
    pub fn label(self) -> &'static str {
        match self {
            Status::Nouveau => "Nouveau",
            Status::Attente => "En attente",
            Status::Entree => "Entrée",
            Status::Sortie => "Sortie",
            Status::Refus => "Refusé",
            Status::Absent => "Absent",
        }
    }

    /// Parse a wire spelling. Returns `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOUVEAU" => Some(Status::Nouveau),
            "ATTENTE" => Some(Status::Attente),
            "ENTREE" => Some(Status::Entree),
            "SORTIE" => Some(Status::Sortie),
            "REFUS" => Some(Status::Refus),
            "ABSENT" => Some(Status::Absent),
            _ => None,
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Sortie)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change was rejected by the state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The accreditation is in `SORTIE`; nothing can follow an exit.
    #[error("accreditation already exited (SORTIE is terminal)")]
    Terminal,

    /// From `ENTREE` the only legal move is `SORTIE`.
    #[error("illegal regression from ENTREE to {to}: an entered vehicle can only exit")]
    IllegalRegression {
        /// The rejected target status.
        to: Status,
    },

    /// Entering `ENTREE` starts the irreversible on-site timer, so the
    /// caller must confirm the transition explicitly.
    #[error("entering ENTREE requires explicit confirmation")]
    ConfirmationRequired,
}

/// What a successful transition did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionOutcome {
    /// The status actually changed (false for a same-status no-op).
    pub changed: bool,
    /// `entry_at` was set by this transition.
    pub entry_set: bool,
    /// `exit_at` was set by this transition.
    pub exit_set: bool,
}

/// Check whether `from → to` is legal under the strict rule.
///
/// A same-status transition is always a legal no-op, including
/// `SORTIE → SORTIE`, so idempotent PATCHes never fail.
///
/// # Errors
///
/// [`TransitionError::Terminal`] out of `SORTIE`,
/// [`TransitionError::IllegalRegression`] out of `ENTREE` to anything
/// but `SORTIE`, and [`TransitionError::ConfirmationRequired`] when
/// entering `ENTREE` without `confirmed`.
pub fn check_transition(from: Status, to: Status, confirmed: bool) -> Result<(), TransitionError> {
    if from == to {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(TransitionError::Terminal);
    }
    if from == Status::Entree && to != Status::Sortie {
        return Err(TransitionError::IllegalRegression { to });
    }
    if to == Status::Entree && !confirmed {
        return Err(TransitionError::ConfirmationRequired);
    }
    Ok(())
}

/// Time spent on site: `exit - entry` when both timestamps exist and the
/// exit is strictly after the entry, otherwise `None` (rendered as "-").
pub fn duration_on_site(
    entry_at: Option<DateTime<Utc>>,
    exit_at: Option<DateTime<Utc>>,
) -> Option<Duration> {
    match (entry_at, exit_at) {
        (Some(entry), Some(exit)) if exit > entry => Some(exit - entry),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_spellings_roundtrip() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(Status::parse("PARTI"), None);
        assert_eq!(Status::parse("attente"), None);
    }

    #[test]
    fn sortie_is_terminal() {
        for to in Status::ALL {
            if to == Status::Sortie {
                continue;
            }
            assert_eq!(
                check_transition(Status::Sortie, to, true),
                Err(TransitionError::Terminal)
            );
        }
    }

    #[test]
    fn sortie_to_sortie_is_a_noop() {
        assert!(check_transition(Status::Sortie, Status::Sortie, false).is_ok());
    }

    #[test]
    fn entree_only_advances_to_sortie() {
        assert!(check_transition(Status::Entree, Status::Sortie, false).is_ok());
        for to in [Status::Nouveau, Status::Attente, Status::Refus, Status::Absent] {
            assert_eq!(
                check_transition(Status::Entree, to, true),
                Err(TransitionError::IllegalRegression { to })
            );
        }
    }

    #[test]
    fn entering_entree_requires_confirmation() {
        assert_eq!(
            check_transition(Status::Attente, Status::Entree, false),
            Err(TransitionError::ConfirmationRequired)
        );
        assert!(check_transition(Status::Attente, Status::Entree, true).is_ok());
    }

    #[test]
    fn administrative_statuses_move_freely() {
        let admin = [Status::Nouveau, Status::Attente, Status::Refus, Status::Absent];
        for from in admin {
            for to in admin {
                assert!(check_transition(from, to, false).is_ok());
            }
            // Direct exit without an entry is permitted (gate operators
            // close out no-show records that way).
            assert!(check_transition(from, Status::Sortie, false).is_ok());
        }
    }

    #[test]
    fn duration_requires_both_timestamps_in_order() {
        let entry = Utc::now();
        let exit = entry + Duration::minutes(90);
        assert_eq!(duration_on_site(Some(entry), Some(exit)), Some(Duration::minutes(90)));
        assert_eq!(duration_on_site(Some(entry), None), None);
        assert_eq!(duration_on_site(None, Some(exit)), None);
        assert_eq!(duration_on_site(Some(exit), Some(entry)), None);
        assert_eq!(duration_on_site(Some(entry), Some(entry)), None);
    }
}
