#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_commands::{permission_changes, GRANT_PERMISSION_VOCABULARY};

fuzz_target!(|data: &[u8]| {
    let tail = String::from_utf8_lossy(data);
    let diff = permission_changes(&tail);

    for token in diff.add.iter().chain(diff.remove.iter()) {
        assert!(GRANT_PERMISSION_VOCABULARY.contains(&token.as_str()));
        assert!(!token.contains(char::is_whitespace));
    }
});
