#![no_main]

use libfuzzer_sys::fuzz_target;
use stagehand::domain::ports::EngineMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // One engine stdout line - this should never panic
        let _ = serde_json::from_str::<EngineMessage>(line.trim());
    }
});
