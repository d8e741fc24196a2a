//! Fuzz testing for input validation and quota override parsing.
//!
//! Every function here takes caller- or operator-controlled text. The target
//! checks that none of them panic and that accepted values honour their
//! documented bounds.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use board_gate::config::parse_quota_overrides;
use board_gate::quota::QuotaDefinition;
use board_gate::validation::{
    MAX_FILE_NAME_LENGTH, MAX_MESSAGE_LENGTH, validate_content, validate_email,
    validate_file_name,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(content) = validate_content(s) {
        let length = content.chars().count();
        assert!((1..=MAX_MESSAGE_LENGTH).contains(&length));
        assert_eq!(content, content.trim());
    }

    if let Ok(name) = validate_file_name(s) {
        assert!(name.chars().count() <= MAX_FILE_NAME_LENGTH);
        assert!(!name.contains('/') && !name.contains('\\'));
    }

    let _ = validate_email(s);

    if let Ok(definition) = QuotaDefinition::parse_override(s) {
        assert!(definition.rate > 0);
        assert!(definition.capacity >= definition.rate);
        assert!(!definition.period().is_zero());
        assert!(definition.to_quota().is_ok());
    }

    let _ = parse_quota_overrides(s);
});
