#![no_main]

use libfuzzer_sys::fuzz_target;
use salestax::taxid::{EinValidator, FormatValidator, ValidatorRegistry, validate_vat_number};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic, errors are fine.
        let _ = validate_vat_number(s);
        let _ = EinValidator.validate("US", s);

        let registry = ValidatorRegistry::offline();
        for country in ["FR", "GR", "IM", "NL", "CA"] {
            if let Some(rule) = registry.rule(country) {
                let _ = rule.format.validate(country, s);
            }
        }
    }
});
