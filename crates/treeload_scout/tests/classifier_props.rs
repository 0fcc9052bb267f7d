use proptest::prelude::*;
use treeload_scout::{ContentClassifier, ContentDecision, SkipReason, DEFAULT_BINARY_EXTENSIONS};

proptest! {
    #[test]
    fn binary_extensions_skip_regardless_of_size(
        idx in 0..DEFAULT_BINARY_EXTENSIONS.len(),
        size in any::<u64>(),
        max in 1..u64::MAX,
        upper in any::<bool>(),
    ) {
        let ext = DEFAULT_BINARY_EXTENSIONS[idx];
        let ext = if upper { ext.to_uppercase() } else { ext.to_string() };
        let decision = ContentClassifier::default().classify(&format!(".{}", ext), size, max);
        prop_assert_eq!(decision, ContentDecision::Skip(SkipReason::Binary));
    }

    #[test]
    fn text_files_follow_the_size_limit(size in any::<u64>(), max in 1..u64::MAX) {
        let decision = ContentClassifier::default().classify(".txt", size, max);
        if size >= max {
            prop_assert_eq!(decision, ContentDecision::Skip(SkipReason::TooLarge));
        } else {
            prop_assert_eq!(decision, ContentDecision::Read);
        }
    }

    #[test]
    fn empty_policy_reads_everything_under_limit(ext in "[a-z]{1,5}", size in 0u64..1024) {
        let classifier = ContentClassifier::new(Vec::<String>::new());
        prop_assert!(classifier.should_read(&ext, size, 1024));
    }
}
