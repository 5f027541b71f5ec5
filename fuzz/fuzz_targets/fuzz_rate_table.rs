#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Malformed tables must be rejected, never panic.
        let _ = salestax::RateRepository::from_json(s);
        let _ = salestax::EconomicRegions::from_json(s);
    }
});
