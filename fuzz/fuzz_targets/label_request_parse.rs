#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_commands::label_changes;

// First input line seeds the repository label set, the rest is the command
// tail. Whatever the tail holds, every returned name must come from the
// repository set and be trimmed.
fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (first, tail) = raw.split_once('\n').unwrap_or((raw.as_ref(), ""));
    let repository: Vec<String> = first
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let diff = label_changes(tail, &repository);

    for name in diff.add.iter().chain(diff.remove.iter()) {
        assert!(repository.iter().any(|label| label == name));
        assert_eq!(name.trim(), name.as_str());
    }
});
