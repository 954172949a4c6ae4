#![no_main]

use libfuzzer_sys::fuzz_target;
use stagehand::presentation::tree;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Every argv resolves to a run or to help
        if let Ok(registry) = tree::registry() {
            let _ = registry.dispatch(content.split('\0'));
        }
    }
});
