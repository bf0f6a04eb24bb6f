#![no_main]

use ash_rpc_dispatch::{Payload, parse_payload_slice};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Payload::Batch(items)) = parse_payload_slice(data) {
        assert!(!items.is_empty());
    }
});
