//! heatnet-sim: run a coordinator against an in-memory network.
//!
//! ```text
//! heatnet-sim <config.json> [cycles]
//! ```
//!
//! Every configured demand device demands on every cycle, so the log shows
//! the cap, the queue and the response dispatch at work.  `RUST_LOG`
//! controls verbosity (default `info`).
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::info;

use heatnet::adapters::config_file::JsonConfigStore;
use heatnet::adapters::log_sink::LogEventSink;
use heatnet::adapters::memory::InMemoryNetwork;
use heatnet::adapters::time::ManualClock;
use heatnet::app::commands::CycleTopic;
use heatnet::app::ports::{Clock, ConfigPort};
use heatnet::app::service::CommunicationCoordinator;
use heatnet::timer::BuiltinTimers;

const DEFAULT_CYCLES: u32 = 20;
const CYCLE_PERIOD: Duration = Duration::from_secs(1);

fn setup_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        let program = args.first().map_or("heatnet-sim", String::as_str);
        bail!("usage: {program} <config.json> [cycles]");
    };
    let cycles: u32 = match args.get(2) {
        Some(n) => n.parse().with_context(|| format!("invalid cycle count '{n}'"))?,
        None => DEFAULT_CYCLES,
    };

    let store = JsonConfigStore::new(path);
    let config = store.load().context("failed to load configuration")?;

    // Devices exist even if the coordinator has to heal its config first.
    let mut net = InMemoryNetwork::new();
    let candidate = config.healed().unwrap_or_else(|| config.clone());
    let demanders: Vec<_> = match candidate.validate(&BuiltinTimers) {
        Ok(setup) => {
            net.populate(&setup);
            setup.slots.into_iter().map(|slot| slot.demand).collect()
        }
        Err(e) => {
            info!("network left empty: {}", e);
            Vec::new()
        }
    };

    let clock = ManualClock::new();
    let mut sink = LogEventSink::new();
    let mut coordinator = CommunicationCoordinator::new(config, clock.now());
    coordinator.start(&mut sink);

    for _ in 0..cycles {
        for device in &demanders {
            net.write_demand(device, true);
        }
        clock.advance(CYCLE_PERIOD);
        coordinator.on_cycle(CycleTopic::BeforeWrite, clock.now(), &mut net, &mut sink);
        coordinator.on_cycle(CycleTopic::AfterControllers, clock.now(), &mut net, &mut sink);
    }

    info!("final: {}", coordinator.status().summary());
    coordinator.shutdown(&mut net, &mut sink);
    coordinator.save_if_dirty(&store);
    Ok(())
}
