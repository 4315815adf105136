//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use tchat_app::{CommandKind, View, focus};

use super::{AppSnapshot, Invariant, InvariantResult};

/// Focus must be a legal target of the active view.
///
/// Keystrokes are routed by focus; an illegal target would send them to a
/// field the user cannot see.
pub struct FocusLegal;

impl Invariant for FocusLegal {
    fn name(&self) -> &'static str {
        "focus_legal"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        if focus::is_legal(state.view, state.focus) {
            Ok(())
        } else {
            Err(self.violation(format!("{:?} is not legal in {:?}", state.focus, state.view)))
        }
    }
}

/// No field exceeds its length limit and every cursor is within its field.
pub struct FieldWithinMax;

impl Invariant for FieldWithinMax {
    fn name(&self) -> &'static str {
        "field_within_max"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        for field in &state.fields {
            if field.len > field.max_length {
                return Err(self.violation(format!(
                    "{:?}: length {} exceeds max {}",
                    field.id, field.len, field.max_length
                )));
            }
            if field.cursor > field.len {
                return Err(self.violation(format!(
                    "{:?}: cursor {} past length {}",
                    field.id, field.cursor, field.len
                )));
            }
        }
        Ok(())
    }
}

/// Every timeline is sorted by timestamp.
pub struct TimelineOrdered;

impl Invariant for TimelineOrdered {
    fn name(&self) -> &'static str {
        "timeline_ordered"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        for timeline in &state.timelines {
            if let Some(pos) = timeline.timestamps.windows(2).position(|w| w[1] < w[0]) {
                return Err(self.violation(format!(
                    "{}: timestamp {} follows {} at index {}",
                    timeline.conversation,
                    timeline.timestamps[pos + 1],
                    timeline.timestamps[pos],
                    pos + 1
                )));
            }
        }
        Ok(())
    }
}

/// A message id appears at most once per timeline.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        for timeline in &state.timelines {
            let mut seen = HashSet::new();
            if let Some(dup) = timeline.message_ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(
                    self.violation(format!("{}: duplicate message {dup}", timeline.conversation))
                );
            }
        }
        Ok(())
    }
}

/// Scroll offsets stay within the buffer.
pub struct ScrollInBounds;

impl Invariant for ScrollInBounds {
    fn name(&self) -> &'static str {
        "scroll_in_bounds"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        for timeline in &state.timelines {
            if timeline.offset > timeline.max_offset {
                return Err(self.violation(format!(
                    "{}: offset {} past max {}",
                    timeline.conversation, timeline.offset, timeline.max_offset
                )));
            }
        }
        Ok(())
    }
}

/// The selected channel index points into the filtered list, or is zero if
/// the list is empty.
pub struct SelectionInBounds;

impl Invariant for SelectionInBounds {
    fn name(&self) -> &'static str {
        "selection_in_bounds"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        let ok = if state.filtered_channels == 0 {
            state.selected_channel == 0
        } else {
            state.selected_channel < state.filtered_channels
        };
        if ok {
            Ok(())
        } else {
            Err(self.violation(format!(
                "selected {} of {} channels",
                state.selected_channel, state.filtered_channels
            )))
        }
    }
}

/// Views other than Login are only reachable with a session.
pub struct SessionMatchesView;

impl Invariant for SessionMatchesView {
    fn name(&self) -> &'static str {
        "session_matches_view"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        if state.view != View::Login && !state.authenticated {
            return Err(self.violation(format!("{:?} shown without a session", state.view)));
        }
        if state.view == View::Login && state.authenticated {
            return Err(self.violation("login shown with an active session".into()));
        }
        Ok(())
    }
}

/// An optimistic echo belongs to the send currently in flight.
///
/// Not checked after termination: quitting cancels every op and nothing is
/// drawn again.
pub struct EchoTracksSend;

impl Invariant for EchoTracksSend {
    fn name(&self) -> &'static str {
        "echo_tracks_send"
    }

    fn check(&self, state: &AppSnapshot) -> InvariantResult {
        if state.terminated {
            return Ok(());
        }
        match (state.echo, state.pending_handle(CommandKind::SendMessage)) {
            (Some(echo), Some(pending)) if echo != pending => Err(self.violation(format!(
                "echo of send {echo} while send {pending} is pending"
            ))),
            (Some(echo), None) => {
                Err(self.violation(format!("echo of send {echo} with no send pending")))
            },
            _ => Ok(()),
        }
    }
}
