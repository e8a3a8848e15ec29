//! Fuzz target: slot and response table entries
//!
//! Feeds arbitrary text through the `:`-separated entry parsers and the
//! full `validate` path, verifying:
//! - No panics on any input
//! - Parsed tags and identifiers stay within their fixed capacities
//! - A successful validation always names only declared request types
//!
//! cargo fuzz run fuzz_config_entries

#![no_main]

use heatnet::config::{CoordinatorConfig, parse_response_entry, parse_slot_entry};
use heatnet::request::{MAX_ID_LEN, MAX_TAG_LEN, RequestTypeSet};
use heatnet::timer::BuiltinTimers;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let types = match RequestTypeSet::from_tags(["HEAT", "MORE_HEAT"]) {
        Ok(t) => t,
        Err(_) => return,
    };

    for line in text.lines() {
        if let Ok(slot) = parse_slot_entry(line, &types) {
            assert!(slot.demand.as_str().len() <= MAX_ID_LEN);
            assert!(slot.ack.as_str().len() <= MAX_ID_LEN);
            assert!(types.contains(&slot.request_type));
        }
        if let Ok((request_type, _)) = parse_response_entry(line, &types) {
            assert!(request_type.as_str().len() <= MAX_TAG_LEN);
            assert!(types.contains(&request_type));
        }
    }

    // Split the input into the two tables and run the whole validation.
    let mut lines = text.lines();
    let slots: Vec<String> = lines.by_ref().take_while(|l| !l.is_empty()).map(String::from).collect();
    let responses: Vec<String> = lines.map(String::from).collect();
    let config = CoordinatorConfig {
        request_types: vec!["HEAT".into(), "MORE_HEAT".into()],
        slots,
        responses,
        ..CoordinatorConfig::default()
    };
    if let Ok(setup) = config.validate(&BuiltinTimers) {
        for slot in &setup.slots {
            assert!(setup.types.contains(&slot.request_type));
        }
        for (request_type, _) in &setup.responses {
            assert!(setup.types.contains(request_type));
        }
    }
    // Healing must never panic and must yield a config it would not heal again.
    if let Some(healed) = config.healed() {
        assert!(healed.healed().is_none());
    }
});
