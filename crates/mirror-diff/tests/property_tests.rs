use mirror_diff::{DiffEngine, SpanKind, apply};
use proptest::prelude::*;

proptest! {
    #[test]
    fn replaying_record_reconstructs_new(old in "\\PC{0,40}", new in "\\PC{0,40}") {
        let record = DiffEngine::unbounded().diff(&old, &new);
        prop_assert_eq!(apply(&old, &record).unwrap(), new);
    }

    #[test]
    fn deleted_and_inserted_char_counts_balance(old in "[a-c]{0,30}", new in "[a-c]{0,30}") {
        let record = DiffEngine::unbounded().diff(&old, &new);
        let (inserted, deleted) = record.churn();
        prop_assert_eq!(
            old.chars().count() + inserted - deleted,
            new.chars().count()
        );
        for span in record.spans() {
            prop_assert!(!span.text.is_empty());
            prop_assert!(matches!(span.kind, SpanKind::Insert | SpanKind::Delete));
        }
    }
}
