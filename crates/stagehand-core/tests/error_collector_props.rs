#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use stagehand_core::{ErrorCollector, ErrorKind, StagedError};

fn message_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ]{0,24}"
}

proptest! {
    /// k recorded errors fail the check iff k > 0, listing each message in order
    #[test]
    fn prop_check_reports_every_message_in_order(
        messages in prop::collection::vec(message_strategy(), 0..12)
    ) {
        let mut errors = ErrorCollector::new();
        for (i, message) in messages.iter().enumerate() {
            errors.add_error(ErrorKind::InvalidArgument, format!("#{i} {message}"));
        }

        match errors.check_errors() {
            Ok(()) => prop_assert!(messages.is_empty()),
            Err(err) => {
                prop_assert!(!messages.is_empty());
                prop_assert_eq!(err.kind(), ErrorKind::ValidationFailed);

                let mut cursor = 0;
                for (i, message) in messages.iter().enumerate() {
                    let needle = format!("#{i} {message}");
                    let found = err.message()[cursor..].find(&needle);
                    prop_assert!(found.is_some(), "missing '{}'", needle);
                    cursor += found.unwrap() + needle.len();
                }
            }
        }
    }

    /// has_errors agrees with the outcome of check_errors
    #[test]
    fn prop_has_errors_matches_check(
        messages in prop::collection::vec(message_strategy(), 0..8),
        existing in prop::collection::vec(message_strategy(), 0..4),
    ) {
        let mut errors = ErrorCollector::new();
        for message in &messages {
            errors.add_error(ErrorKind::InvalidArgument, message.clone());
        }
        for message in &existing {
            errors.add_existing_error(StagedError::invalid_argument(message.clone()));
        }

        prop_assert_eq!(errors.has_errors(), errors.check_errors().is_err());
        prop_assert_eq!(errors.error_count(), messages.len() + existing.len());
    }

    /// Clearing returns the collector to the empty state
    #[test]
    fn prop_clear_resets(messages in prop::collection::vec(message_strategy(), 0..8)) {
        let mut errors = ErrorCollector::new();
        for message in &messages {
            errors.add_error(ErrorKind::InvalidArgument, message.clone());
        }

        errors.clear_errors();

        prop_assert!(!errors.has_errors());
        prop_assert_eq!(errors.error_count(), 0);
        prop_assert!(errors.check_errors().is_ok());
    }
}
