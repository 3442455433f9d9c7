//! Observable events
//!
//! Every line the logger emits names one of these events. Each event has a
//! fixed severity so call sites cannot drift.

use std::fmt;

use super::logger::Severity;

/// Observable events in treestore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Handle lifecycle
    /// Store handle opened
    StoreOpened,
    /// Store handle closed
    StoreClosed,

    // Write path
    /// Dry run rejected a tree
    ValidateFailed,
    /// Scalar flag on a multi-element value was ignored
    ScalarFlagIgnored,
    /// Tree committed
    WriteComplete,
    /// Staged write failed and staging was removed
    StagedWriteRollback,
    /// Previous destination could not be moved back after a failed swap
    StagedBackupStranded,
    /// Previous destination could not be removed after a successful swap
    StagedBackupLeft,

    // Read path
    /// Tree reconstructed
    ReadComplete,

    // File engine
    /// Container image persisted
    ContainerPersisted,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreClosed => "STORE_CLOSED",
            Event::ValidateFailed => "TREE_VALIDATE_FAILED",
            Event::ScalarFlagIgnored => "SCALAR_FLAG_IGNORED",
            Event::WriteComplete => "TREE_WRITE_COMPLETE",
            Event::StagedWriteRollback => "STAGED_WRITE_ROLLBACK",
            Event::StagedBackupStranded => "STAGED_BACKUP_STRANDED",
            Event::StagedBackupLeft => "STAGED_BACKUP_LEFT",
            Event::ReadComplete => "TREE_READ_COMPLETE",
            Event::ContainerPersisted => "CONTAINER_PERSISTED",
        }
    }

    /// Severity this event is always logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReadComplete | Event::ContainerPersisted => Severity::Trace,
            Event::StoreOpened | Event::StoreClosed | Event::WriteComplete => Severity::Info,
            Event::ValidateFailed | Event::ScalarFlagIgnored | Event::StagedBackupLeft => {
                Severity::Warn
            }
            Event::StagedWriteRollback | Event::StagedBackupStranded => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::StoreOpened,
            Event::StoreClosed,
            Event::ValidateFailed,
            Event::ScalarFlagIgnored,
            Event::WriteComplete,
            Event::StagedWriteRollback,
            Event::StagedBackupStranded,
            Event::StagedBackupLeft,
            Event::ReadComplete,
            Event::ContainerPersisted,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severities() {
        assert_eq!(Event::ScalarFlagIgnored.severity(), Severity::Warn);
        assert_eq!(Event::StagedWriteRollback.severity(), Severity::Error);
        assert_eq!(Event::ContainerPersisted.severity(), Severity::Trace);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::WriteComplete), "TREE_WRITE_COMPLETE");
    }
}
