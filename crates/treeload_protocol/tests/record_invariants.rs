//! Property tests for FileRecord construction invariants.

use proptest::prelude::*;
use std::path::PathBuf;
use treeload_protocol::{content_hash, FileMetadata, FileRecord, RunId};

fn arb_record() -> impl Strategy<Value = FileRecord> {
    let path = "[a-z]{1,8}(/[a-z]{1,8}){0,3}(\\.[a-z]{1,4})?";
    (path, prop::option::of(".{0,64}"), ".{0,32}").prop_map(|(p, content, reason)| {
        let meta = FileMetadata::from_path(&PathBuf::from(format!("/{}", p)));
        match content {
            Some(text) => FileRecord::readable(RunId::new(), meta, text),
            None => FileRecord::unreadable(RunId::new(), meta, reason),
        }
    })
}

proptest! {
    #[test]
    fn hash_present_iff_content_present(record in arb_record()) {
        prop_assert_eq!(record.content().is_some(), record.content_hash().is_some());
    }

    #[test]
    fn readable_implies_content_and_no_error(record in arb_record()) {
        if record.is_readable() {
            prop_assert!(record.content().is_some());
            prop_assert!(record.content_hash().is_some());
            prop_assert!(record.error_message().is_none());
        } else {
            prop_assert!(record.error_message().is_some());
        }
    }

    #[test]
    fn hash_matches_content(text in ".{0,256}") {
        let meta = FileMetadata::from_path(&PathBuf::from("/tmp/a.txt"));
        let record = FileRecord::readable(RunId::new(), meta, text.clone());
        let expected = content_hash(&text);
        prop_assert_eq!(record.content_hash(), Some(expected.as_str()));
    }
}
