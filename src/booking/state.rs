//! Booking lifecycle states
//!
//! State IDs are stored as SMALLINT. Terminal states: COMPLETED (20),
//! CANCELLED (-10).

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum BookingStatus {
    /// Submitted by a passenger, visible in the feed
    Pending = 0,

    /// Accepted by exactly one driver, fee debited
    Confirmed = 10,

    /// Terminal: ride done
    Completed = 20,

    /// Terminal: cancelled by admin or the accepting driver
    Cancelled = -10,
}

/// Lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Accept,
    Complete,
    Cancel,
}

impl BookingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::Accept => "accept",
            BookingEvent::Complete => "complete",
            BookingEvent::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a {from} booking", .event.as_str())]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub event: BookingEvent,
}

impl BookingStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(BookingStatus::Pending),
            10 => Some(BookingStatus::Confirmed),
            20 => Some(BookingStatus::Completed),
            -10 => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Target state for `event`, or the rejected pair
    ///
    /// Callers persist the result with a compare-and-swap on `self`.
    pub fn apply(self, event: BookingEvent) -> Result<BookingStatus, InvalidTransition> {
        use BookingEvent::*;
        use BookingStatus::*;

        match (self, event) {
            (Pending, Accept) => Ok(Confirmed),
            (Pending, Cancel) => Ok(Cancelled),
            (Confirmed, Complete) => Ok(Completed),
            (Confirmed, Cancel) => Ok(Cancelled),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for BookingStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        BookingStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(
            BookingStatus::Pending.apply(BookingEvent::Accept),
            Ok(BookingStatus::Confirmed)
        );
        assert_eq!(
            BookingStatus::Pending.apply(BookingEvent::Cancel),
            Ok(BookingStatus::Cancelled)
        );
        assert_eq!(
            BookingStatus::Confirmed.apply(BookingEvent::Complete),
            Ok(BookingStatus::Completed)
        );
        assert_eq!(
            BookingStatus::Confirmed.apply(BookingEvent::Cancel),
            Ok(BookingStatus::Cancelled)
        );
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(BookingStatus::Pending.apply(BookingEvent::Complete).is_err());
        assert!(BookingStatus::Confirmed.apply(BookingEvent::Accept).is_err());

        for event in [BookingEvent::Accept, BookingEvent::Complete, BookingEvent::Cancel] {
            for terminal in [BookingStatus::Completed, BookingStatus::Cancelled] {
                let err = terminal.apply(event).unwrap_err();
                assert_eq!(err.from, terminal);
                assert_eq!(err.event, event);
            }
        }
    }

    #[test]
    fn test_state_id_roundtrip() {
        for state in ALL {
            assert_eq!(BookingStatus::from_id(state.id()), Some(state));
        }
        assert!(BookingStatus::from_id(999).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(BookingStatus::Confirmed.to_string(), "confirmed");
        let err = BookingStatus::Completed.apply(BookingEvent::Cancel).unwrap_err();
        assert_eq!(err.to_string(), "cannot cancel a completed booking");
    }
}
