#![no_main]

use libfuzzer_sys::fuzz_target;

use wirecache::proxy::http::fuzzing::{accumulate_client_header, parse_request_line};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        parse_request_line(text);
        accumulate_client_header(text);
    }
});
