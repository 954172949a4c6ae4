#![no_main]

use chrono::Utc;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Lock files are read back from a shared home; treat them as hostile
    if let Ok(record) = serde_json::from_slice::<stagehand::LockRecord>(data) {
        let _ = record.describe(Utc::now());
    }
});
