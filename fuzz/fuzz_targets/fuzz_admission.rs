//! Fuzz target: admission controller
//!
//! Drives arbitrary demand patterns, cap changes and forcing toggles
//! through `RequestAdmissionController`, verifying:
//! - Occupancy never exceeds the cap unless forcing is on or the cap was
//!   just lowered below the current occupancy
//! - A key that keeps demanding is never evicted
//! - Only demanding keys are admitted or waiting
//!
//! cargo fuzz run fuzz_admission

#![no_main]

use std::collections::BTreeMap;

use heatnet::admission::{QueuePolicy, RequestAdmissionController};
use heatnet::request::{DemandSlot, DeviceId, RequestType, SlotKey};
use libfuzzer_sys::fuzz_target;

const KEYS: SlotKey = 8;

fn controller() -> Option<RequestAdmissionController> {
    let mut c = RequestAdmissionController::new(2, QueuePolicy::Fifo).ok()?;
    let heat = RequestType::new("HEAT").ok()?;
    for key in 0..KEYS {
        c.add_slot(DemandSlot {
            slot_key: key,
            demand: DeviceId::new(&format!("Rest{key}")).ok()?,
            ack: DeviceId::new(&format!("Ack{key}")).ok()?,
            request_type: heat.clone(),
        });
    }
    Some(c)
}

fuzz_target!(|data: &[u8]| {
    let Some(mut c) = controller() else {
        return;
    };
    let mut previous: Vec<SlotKey> = Vec::new();

    for &byte in data {
        // Top bits select an operation, the low byte is a demand bitmap.
        match byte >> 6 {
            0b11 => {
                let _ = c.set_max_concurrent(u32::from(byte & 0x07));
                continue;
            }
            0b10 if byte & 0x20 != 0 => {
                c.set_forcing(!c.forcing());
                continue;
            }
            _ => {}
        }

        let demand: BTreeMap<SlotKey, bool> =
            (0..KEYS).map(|k| (k, byte & (1 << k) != 0)).collect();
        let admission = c.admit(&demand);

        for key in previous.iter().filter(|k| demand[*k]) {
            assert!(admission.admitted.contains(key), "slot {key} evicted");
        }
        for key in admission.admitted.iter().chain(&admission.waiting) {
            assert!(demand[key], "slot {key} holds a position without demand");
        }
        if !c.forcing() {
            let kept = previous.iter().filter(|k| demand[*k]).count();
            let cap = c.max_concurrent() as usize;
            assert!(admission.admitted.len() <= cap.max(kept));
        }
        previous = c.admitted().to_vec();
    }
});
