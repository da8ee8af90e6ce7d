//! Fuzz target for list-file parsing.
//!
//! Feeds arbitrary UTF-8 text to the list reader and writes back whatever
//! parses, checking for panics and runaway recursion.

#![no_main]

use facelabel::model::io_lst::fuzz_parse_list_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_list_line(text);
});
