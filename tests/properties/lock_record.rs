//! Property tests for lock records read back from a home provider.

use std::fs;

use proptest::prelude::*;

use stagehand::domain::ports::Backend;
use stagehand::infrastructure::backend::LocalBackend;
use stagehand::{HolderId, LockRecord, StageKey};

fn holder() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z]{1,8}@[a-z0-9-]{1,8}:[0-9]{1,5}/[a-f0-9]{8}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a damaged lock file is reported, never trusted or panicked on.
    #[test]
    fn property_garbage_lock_files_are_errors(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assume!(serde_json::from_slice::<LockRecord>(&bytes).is_err());
        let home = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(home.path());
        let key = StageKey::new("shop", "alice").unwrap();
        let dir = backend.stage_dir(&key);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("lock.json"), &bytes).unwrap();

        prop_assert!(backend.current_lock(&key).is_err());
    }

    /// PROPERTY: whoever acquires is the one reported as holder.
    #[test]
    fn property_acquired_lock_reports_its_holder(id in holder()) {
        let home = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(home.path());
        let key = StageKey::new("shop", "alice").unwrap();
        let holder = HolderId::new(id);

        let record = backend.acquire_lock(&key, &holder).unwrap();
        prop_assert!(record.is_held_by(&holder));

        let current = backend.current_lock(&key).unwrap();
        prop_assert_eq!(current, Some(record));
        backend.release_lock(&key, &holder).unwrap();
        prop_assert_eq!(backend.current_lock(&key).unwrap(), None);
    }
}
