//! Editorial lifecycle of a card: new -> to_correct -> approved / rejected,
//! with archiving layered on top of any status.

use crate::domain::model::{ArchiveState, CardContent, ReviewState, ReviewStatus};
use crate::utils::error::{CardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    /// Take the card as it is.
    Accept,
    /// Mark the card as needing an edit before it can be approved.
    FlagForCorrection,
    /// Discard the card.
    Reject,
    /// Approve with edited content; the content has to differ from what is stored.
    Correct { front: String, back: String },
    Archive,
    Unarchive,
}

impl ReviewAction {
    fn name(&self) -> &'static str {
        match self {
            ReviewAction::Accept => "accept",
            ReviewAction::FlagForCorrection => "flag for correction",
            ReviewAction::Reject => "reject",
            ReviewAction::Correct { .. } => "correct",
            ReviewAction::Archive => "archive",
            ReviewAction::Unarchive => "unarchive",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReviewEvent {
    StatusChanged {
        from: ReviewStatus,
        to: ReviewStatus,
        content_edited: bool,
    },
    Archived {
        at: DateTime<Utc>,
    },
    Unarchived,
}

/// Result of one transition. `content` is set when the action carried an
/// edit; it must be persisted in the same write as `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTransition {
    pub state: ReviewState,
    pub content: Option<CardContent>,
    pub event: ReviewEvent,
}

pub fn apply(
    current: &ReviewState,
    current_content: &CardContent,
    action: ReviewAction,
    now: DateTime<Utc>,
) -> Result<ReviewTransition> {
    match action {
        ReviewAction::Archive => match current.archive {
            ArchiveState::Active => Ok(ReviewTransition {
                state: ReviewState {
                    status: current.status,
                    archive: ArchiveState::Archived { at: now },
                },
                content: None,
                event: ReviewEvent::Archived { at: now },
            }),
            ArchiveState::Archived { .. } => Err(invalid(current, &action)),
        },
        ReviewAction::Unarchive => match current.archive {
            ArchiveState::Archived { .. } => Ok(ReviewTransition {
                state: ReviewState::new(current.status),
                content: None,
                event: ReviewEvent::Unarchived,
            }),
            ArchiveState::Active => Err(invalid(current, &action)),
        },
        _ if current.is_archived() => Err(invalid(current, &action)),
        action => change_status(current, current_content, action),
    }
}

fn change_status(
    current: &ReviewState,
    current_content: &CardContent,
    action: ReviewAction,
) -> Result<ReviewTransition> {
    use ReviewStatus::*;

    let (to, content) = match (current.status, &action) {
        (New, ReviewAction::Accept) => (Approved, None),
        (New | Rejected, ReviewAction::FlagForCorrection) => (ToCorrect, None),
        (New | ToCorrect, ReviewAction::Reject) => (Rejected, None),
        (New | ToCorrect, ReviewAction::Correct { front, back }) => {
            let edited = CardContent::new(front.as_str(), back.as_str())?;
            if edited == *current_content {
                return Err(CardError::validation(
                    "correction must change the front or back of the card",
                ));
            }
            (Approved, Some(edited))
        }
        _ => return Err(invalid(current, &action)),
    };

    Ok(ReviewTransition {
        state: ReviewState::new(to),
        event: ReviewEvent::StatusChanged {
            from: current.status,
            to,
            content_edited: content.is_some(),
        },
        content,
    })
}

fn invalid(current: &ReviewState, action: &ReviewAction) -> CardError {
    let from = if current.is_archived() {
        format!("{} (archived)", current.status)
    } else {
        current.status.to_string()
    };
    CardError::InvalidTransition {
        from,
        action: action.to_string(),
    }
}
