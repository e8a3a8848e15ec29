//! Communication coordinator: the per-cycle driver.
//!
//! [`CommunicationCoordinator`] owns the timer registry, the
//! exceptional-state gate, the admission controller and the response
//! dispatcher.  All I/O flows through port traits injected at call sites,
//! so a whole cycle runs against an in-memory network in tests.
//!
//! ```text
//!  DemandPort ───▶ ┌──────────────────────────────┐ ──▶ EventSink
//! OverridePort ──▶ │   CommunicationCoordinator    │
//! ResponsePort ◀── │ Timers · Gate · Admit · Plan  │
//! EquipmentPort ◀─ └──────────────────────────────┘
//! ```
//!
//! Nothing in a cycle returns an error: per-action failures are logged,
//! reported as events and collected into the [`CycleReport`].

use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::admission::{Admission, DemandSample, RequestAdmissionController};
use crate::config::{CoordinatorConfig, CoordinatorSetup, KEEP_ALIVE_TIMER_ID};
use crate::dispatch::{DispatchPlan, Invocation, MethodKind, ResponseDispatcher, ResponseValue};
use crate::error::{ConfigError, DispatchError};
use crate::exceptional::{ExceptionalStateGate, Override, OverrideSignal};
use crate::fallback::{AckRule, FallbackPolicy};
use crate::fsm::{ControlMode, CoordinatorState, CycleMode, Lifecycle};
use crate::request::{DeviceId, SlotKey};
use crate::timer::{BuiltinTimers, TimerRegistry};

use super::commands::{CoordinatorCommand, CycleTopic};
use super::events::{CoordinatorEvent, CoordinatorStatus, CycleReport};
use super::ports::{
    ConfigPort, EquipmentKind, EquipmentPort, EquipmentStatus, EventSink, NetworkPort, TimerLookup,
};

// ───────────────────────────────────────────────────────────────
// Runtime wiring (exists only while operational)
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Equipment {
    id: DeviceId,
    kind: EquipmentKind,
    /// Status seen on the previous cycle, for change logging.
    last: Option<EquipmentStatus>,
}

impl Equipment {
    fn new(id: DeviceId, kind: EquipmentKind) -> Self {
        Self { id, kind, last: None }
    }

    fn available(&self) -> bool {
        self.last == Some(EquipmentStatus::Available)
    }
}

#[derive(Debug)]
struct Runtime {
    admission: RequestAdmissionController,
    dispatcher: ResponseDispatcher,
    gate: Option<ExceptionalStateGate>,
    fallback: FallbackPolicy,
    pump: Option<Equipment>,
    line_heater: Option<Equipment>,
    /// Every demand and acknowledgement device, deduplicated.
    link_devices: Vec<DeviceId>,
    /// Last fresh-link admission; admit/release events diff against it.
    last_admission: Admission,
    /// What the last cycle actually drove, whichever mode decided it.
    applied: Admission,
    last_plan: DispatchPlan,
    last_mode: Option<CycleMode>,
    last_control: Option<ControlMode>,
}

impl Runtime {
    /// Wire a runtime from a validated setup.
    ///
    /// With a `previous` runtime, admission order and the override gate
    /// carry over, and timers whose parameters did not change keep their
    /// last reset.
    fn build(
        setup: CoordinatorSetup,
        timers: &mut TimerRegistry,
        previous: Option<&Runtime>,
    ) -> Result<Self, ConfigError> {
        timers.retain(|t| {
            std::iter::once(&setup.keep_alive)
                .chain(setup.exceptional.as_ref())
                .any(|s| s.id == t.id() && s.kind == t.kind() && s.threshold == t.threshold())
        });

        let keep = &setup.keep_alive;
        timers.register(keep.id, keep.kind, keep.threshold)?;
        let gate = match &setup.exceptional {
            Some(spec) => {
                let kept = timers.is_registered(spec.id);
                timers.register(spec.id, spec.kind, spec.threshold)?;
                match previous.and_then(|p| p.gate.clone()) {
                    Some(gate) => {
                        // A new window length restarts a running override.
                        if !kept && gate.is_active() {
                            timers.reset(spec.id)?;
                        }
                        Some(gate)
                    }
                    None => Some(ExceptionalStateGate::new(spec.id)),
                }
            }
            None => None,
        };

        let mut admission = RequestAdmissionController::new(setup.max_concurrent, setup.queue_policy)?;
        admission.set_forcing(setup.force_all);
        for slot in setup.slots {
            admission.add_slot(slot);
        }

        let mut dispatcher = ResponseDispatcher::new(setup.types);
        for (request_type, wrapper) in setup.responses {
            dispatcher.add(request_type, wrapper)?;
        }

        let mut link_devices: Vec<DeviceId> = admission
            .demand_devices()
            .chain(admission.ack_devices())
            .cloned()
            .collect();
        link_devices.sort();
        link_devices.dedup();

        let mut rt = Self {
            admission,
            dispatcher,
            gate,
            fallback: setup.fallback,
            pump: setup.pump.map(|id| Equipment::new(id, EquipmentKind::Pump)),
            line_heater: setup
                .line_heater
                .map(|id| Equipment::new(id, EquipmentKind::LineHeater)),
            link_devices,
            last_admission: Admission::default(),
            applied: Admission::default(),
            last_plan: DispatchPlan::default(),
            last_mode: None,
            last_control: None,
        };
        if let Some(previous) = previous {
            rt.admission.carry_over(&previous.admission);
            rt.last_admission = known_keys(&previous.last_admission, &rt.admission);
            rt.applied = known_keys(&previous.applied, &rt.admission);
            rt.last_plan = previous.last_plan.clone();
            rt.last_mode = previous.last_mode;
            rt.last_control = previous.last_control;
        }
        Ok(rt)
    }
}

/// `admission` restricted to the keys `controller` still has slots for.
fn known_keys(admission: &Admission, controller: &RequestAdmissionController) -> Admission {
    let known = |key: &&SlotKey| controller.slot_keys().any(|k| k == **key);
    Admission {
        admitted: admission.admitted.iter().filter(known).copied().collect(),
        waiting: admission.waiting.iter().filter(known).copied().collect(),
        forced: admission.forced,
    }
}

// ───────────────────────────────────────────────────────────────
// CommunicationCoordinator
// ───────────────────────────────────────────────────────────────

pub struct CommunicationCoordinator<L: TimerLookup = BuiltinTimers> {
    config: CoordinatorConfig,
    lookup: L,
    lifecycle: Lifecycle,
    timers: TimerRegistry,
    runtime: Option<Runtime>,
    /// Runtime parked by a rejected configuration; the next valid one
    /// picks up its admission order.
    retained: Option<Runtime>,
    /// Last sampled demand per device; a silent device keeps its value.
    latched: DemandSample,
    config_dirty: bool,
}

impl CommunicationCoordinator<BuiltinTimers> {
    /// Construct with the stock timer names.  Call [`start`](Self::start) next.
    pub fn new(config: CoordinatorConfig, now: Instant) -> Self {
        Self::with_lookup(config, BuiltinTimers, now)
    }
}

impl<L: TimerLookup> CommunicationCoordinator<L> {
    pub fn with_lookup(config: CoordinatorConfig, lookup: L, now: Instant) -> Self {
        let timers = TimerRegistry::new(&config.id, now);
        Self {
            config,
            lookup,
            lifecycle: Lifecycle::new(),
            timers,
            runtime: None,
            retained: None,
            latched: DemandSample::new(),
            config_dirty: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Leave `Idle` and try to apply the configuration.
    ///
    /// An invalid configuration leaves the coordinator in `ConfigPending`,
    /// from where it keeps requesting a new one.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        if self.lifecycle.current() != CoordinatorState::Idle {
            return;
        }
        info!("[{}] coordinator starting", self.config.id);
        sink.emit(&CoordinatorEvent::Started(self.config.id.clone()));
        self.move_to(CoordinatorState::ConfigPending, sink);
        if let Err(e) = self.configure(sink) {
            debug!("[{}] start deferred: {}", self.config.id, e);
        }
    }

    /// Deactivate everything exactly once and return to `Idle`.
    pub fn shutdown(&mut self, net: &mut impl NetworkPort, sink: &mut impl EventSink) {
        if self.lifecycle.current() == CoordinatorState::Idle {
            return;
        }
        if let Some(rt) = self.runtime.as_mut() {
            for (ack, on) in rt.admission.acks_all(false) {
                net.set_ack(&ack, on);
            }
            let plan = rt.dispatcher.plan_uniform(false, None);
            let failures = apply_plan(&plan, rt, net, sink);
            if !failures.is_empty() {
                warn!(
                    "[{}] {} passive action(s) failed during shutdown",
                    self.config.id,
                    failures.len()
                );
            }
            rt.admission.clear();
            if let Some(gate) = rt.gate.as_mut() {
                gate.clear();
            }
        }
        self.runtime = None;
        self.retained = None;
        self.latched.clear();
        self.timers.release_all();
        self.move_to(CoordinatorState::Idle, sink);
        info!("[{}] coordinator stopped", self.config.id);
        sink.emit(&CoordinatorEvent::Stopped);
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Entry point for the external cycle notification.  Only
    /// `AfterControllers` runs a cycle.
    pub fn on_cycle(
        &mut self,
        topic: CycleTopic,
        now: Instant,
        net: &mut impl NetworkPort,
        sink: &mut impl EventSink,
    ) -> Option<CycleReport> {
        match topic {
            CycleTopic::BeforeWrite => None,
            CycleTopic::AfterControllers => Some(self.tick(now, net, sink)),
        }
    }

    /// Run one coordinator invocation.
    ///
    /// The `net` parameter satisfies every network port at once, which
    /// avoids juggling several mutable borrows of the same adapter.
    pub fn tick(
        &mut self,
        now: Instant,
        net: &mut impl NetworkPort,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        self.timers.advance(now);
        self.lifecycle.tick();

        match self.lifecycle.current() {
            CoordinatorState::Idle => CycleReport::default(),
            CoordinatorState::ConfigPending => self.pending_cycle(sink),
            CoordinatorState::Operational => self.operational_cycle(net, sink),
        }
    }

    fn pending_cycle(&mut self, sink: &mut impl EventSink) -> CycleReport {
        let interval = u64::from(self.config.reconfigure_interval_cycles.max(1));
        if self.lifecycle.cycles_in_state() % interval != 0 {
            return CycleReport::default();
        }

        let healed = match self.config.healed() {
            Some(proposal) => {
                info!(
                    "[{}] self-healing: request types {:?} -> {:?}",
                    self.config.id, self.config.request_types, proposal.request_types
                );
                self.config = proposal;
                self.config_dirty = true;
                true
            }
            None => false,
        };
        sink.emit(&CoordinatorEvent::ReconfigurationRequested { healed });

        if let Err(e) = self.configure(sink) {
            debug!("[{}] still pending: {}", self.config.id, e);
        }
        CycleReport {
            reconfigured: healed,
            ..CycleReport::default()
        }
    }

    fn operational_cycle(&mut self, net: &mut impl NetworkPort, sink: &mut impl EventSink) -> CycleReport {
        let Some(rt) = self.runtime.as_mut() else {
            return CycleReport::default();
        };
        let id = self.config.id.as_str();

        // ── 1. Reconcile shared equipment ──────────────────────
        for equipment in [rt.pump.as_mut(), rt.line_heater.as_mut()].into_iter().flatten() {
            reconcile(id, equipment, &*net);
        }

        // ── 2. Sample demand (read-and-clear, latched) ─────────
        for device in rt.admission.demand_devices() {
            if let Some(on) = net.take_demand(device) {
                self.latched.insert(device.clone(), on);
            }
        }

        // ── 3. Exceptional state (strict priority) ─────────────
        let exceptional = match rt.gate.as_mut() {
            Some(gate) => {
                let was_active = gate.is_active();
                let signal = OverrideSignal {
                    enable: net.take_enable_signal(),
                    value: net.take_override_value(),
                };
                let result = gate.evaluate(signal, &mut self.timers).unwrap_or_else(|e| {
                    warn!("[{}] exceptional state check failed: {}", id, e);
                    None
                });
                match (was_active, result) {
                    (false, Some(o)) => sink.emit(&CoordinatorEvent::ExceptionalEntered { value: o.value() }),
                    (true, None) => sink.emit(&CoordinatorEvent::ExceptionalLeft),
                    _ => {}
                }
                result
            }
            None => None,
        };

        let (mode, applied, acks, plan) = if let Some(o) = exceptional {
            exceptional_outcome(rt, o)
        } else {
            // ── 4. Link freshness from the keep-alive ──────────
            let link_ok = rt.link_devices.iter().all(|d| net.link_ok(d));
            if link_ok {
                if let Err(e) = self.timers.reset(KEEP_ALIVE_TIMER_ID) {
                    warn!("[{}] keep-alive reset failed: {}", id, e);
                }
            }
            let fresh = match self.timers.expired(KEEP_ALIVE_TIMER_ID) {
                Ok(expired) => !expired,
                Err(e) => {
                    warn!("[{}] keep-alive check failed: {}", id, e);
                    false
                }
            };

            if fresh {
                if rt.last_mode == Some(CycleMode::LinkStale) {
                    info!("[{}] link restored", id);
                    sink.emit(&CoordinatorEvent::LinkRestored);
                }
                normal_outcome(id, rt, &self.latched, sink)
            } else {
                if rt.last_mode != Some(CycleMode::LinkStale) {
                    warn!("[{}] keep-alive expired, fallback {}", id, rt.fallback);
                    sink.emit(&CoordinatorEvent::FallbackEngaged(rt.fallback));
                }
                fallback_outcome(rt, &self.latched)
            }
        };

        // ── 5. Apply acknowledgements and responses ────────────
        for (ack, on) in &acks {
            net.set_ack(ack, *on);
        }
        let failures = apply_plan(&plan, rt, net, sink);

        rt.last_mode = Some(mode);
        rt.last_control = Some(match mode {
            CycleMode::ExceptionalActive => ControlMode::select(exceptional, false),
            _ => ControlMode::select(None, rt.admission.forcing()),
        });
        rt.last_plan = plan;
        rt.applied = applied;
        debug!(
            "[{}] cycle {} {}: {} ack(s) on",
            id,
            self.timers.cycle(),
            mode,
            acks.iter().filter(|(_, on)| *on).count()
        );

        // ── 6. Publish status ──────────────────────────────────
        let status = self.status();
        let report = CycleReport {
            mode: Some(mode),
            admitted: status.admitted_count(),
            failures,
            reconfigured: false,
        };
        sink.emit(&CoordinatorEvent::Telemetry(status));
        report
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a runtime write.  Settings are also written into the live
    /// configuration so they survive a rebuild.
    pub fn handle_command(&mut self, cmd: CoordinatorCommand, sink: &mut impl EventSink) -> Result<(), ConfigError> {
        match cmd {
            CoordinatorCommand::SetMaxConcurrent(n) => {
                if let Some(rt) = self.runtime.as_mut() {
                    rt.admission.set_max_concurrent(n)?;
                } else if n == 0 {
                    return Err(ConfigError::InvalidMaxConcurrent(0));
                }
                self.config.max_concurrent = n;
            }
            CoordinatorCommand::SetForcing(on) => {
                if let Some(rt) = self.runtime.as_mut() {
                    rt.admission.set_forcing(on);
                }
                self.config.force_all = on;
            }
            CoordinatorCommand::SetFallback(policy) => {
                if let Some(rt) = self.runtime.as_mut() {
                    if rt.fallback != policy {
                        info!("[{}] fallback {} -> {}", self.config.id, rt.fallback, policy);
                    }
                    rt.fallback = policy;
                }
                self.config.fallback = policy.as_str().to_string();
            }
            CoordinatorCommand::UpdateConfig(config) => {
                info!("[{}] configuration updated at runtime", self.config.id);
                self.config = *config;
                self.config_dirty = true;
                if self.lifecycle.current() != CoordinatorState::Idle {
                    return self.configure(sink);
                }
                return Ok(());
            }
        }
        self.config_dirty = true;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> CoordinatorState {
        self.lifecycle.current()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Snapshot for dashboards.
    pub fn status(&self) -> CoordinatorStatus {
        let mut status = CoordinatorStatus {
            id: self.config.id.clone(),
            state: self.lifecycle.current(),
            cycle: self.timers.cycle(),
            mode: None,
            control: None,
            admitted: Vec::new(),
            waiting: Vec::new(),
            active_types: BTreeMap::new(),
            max_concurrent: self.config.max_concurrent,
            forcing: self.config.force_all,
            fallback: FallbackPolicy::parse(&self.config.fallback).unwrap_or_default(),
        };
        if let Some(rt) = &self.runtime {
            status.mode = rt.last_mode;
            status.control = rt.last_control;
            status.admitted.clone_from(&rt.applied.admitted);
            status.waiting.clone_from(&rt.applied.waiting);
            status.active_types = rt
                .dispatcher
                .types()
                .iter()
                .map(|t| (t.clone(), rt.last_plan.is_active(t)))
                .collect();
            status.max_concurrent = rt.admission.max_concurrent();
            status.forcing = rt.admission.forcing();
            status.fallback = rt.fallback;
        }
        status
    }

    /// Number of admitted slot keys after the last cycle.
    pub fn admitted_count(&self) -> usize {
        self.runtime
            .as_ref()
            .map_or(0, |rt| rt.applied.admitted_count())
    }

    /// Whether a request type was active after the last cycle.
    pub fn is_type_active(&self, tag: &str) -> bool {
        let Some(rt) = &self.runtime else {
            return false;
        };
        rt.dispatcher
            .types()
            .resolve(tag)
            .is_ok_and(|t| rt.last_plan.is_active(&t))
    }

    /// Slot keys currently waiting for a position.
    pub fn waiting(&self) -> &[SlotKey] {
        self.runtime
            .as_ref()
            .map_or(&[][..], |rt| rt.applied.waiting.as_slice())
    }

    // ── Config persistence ────────────────────────────────────

    /// Whether the live configuration has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    /// Persist the live configuration if it changed.  Returns `true` if saved.
    pub fn save_if_dirty(&mut self, store: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match store.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("[{}] configuration saved", self.config.id);
                true
            }
            Err(e) => {
                warn!("[{}] configuration save failed: {}", self.config.id, e);
                false
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Validate the live configuration and rewire the runtime, carrying
    /// over the state of the one it replaces.
    fn configure(&mut self, sink: &mut impl EventSink) -> Result<(), ConfigError> {
        let previous = self.runtime.take().or_else(|| self.retained.take());
        let built = self
            .config
            .validate(&self.lookup)
            .and_then(|setup| Runtime::build(setup, &mut self.timers, previous.as_ref()));
        match built {
            Ok(rt) => {
                info!(
                    "[{}] configured: {} slot(s), {} request type(s), {} response(s), cap {}",
                    self.config.id,
                    rt.admission.slots().count(),
                    rt.dispatcher.types().len(),
                    rt.dispatcher.wrapper_count(),
                    rt.admission.max_concurrent()
                );
                self.runtime = Some(rt);
                self.move_to(CoordinatorState::Operational, sink);
                Ok(())
            }
            Err(e) => {
                error!("[{}] configuration rejected: {}", self.config.id, e);
                // Nothing is driven while pending; only the queue survives it.
                self.retained = previous.map(|mut rt| {
                    if let Some(gate) = rt.gate.as_mut() {
                        gate.clear();
                    }
                    rt.last_mode = None;
                    rt.last_control = None;
                    rt
                });
                self.timers.release_all();
                self.move_to(CoordinatorState::ConfigPending, sink);
                sink.emit(&CoordinatorEvent::ConfigRejected(e.clone()));
                Err(e)
            }
        }
    }

    fn move_to(&mut self, next: CoordinatorState, sink: &mut impl EventSink) {
        let from = self.lifecycle.current();
        if self.lifecycle.transition(next) {
            sink.emit(&CoordinatorEvent::StateChanged { from, to: next });
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cycle outcomes
// ───────────────────────────────────────────────────────────────

/// Mode, the admission actually driven, acknowledgements and plan.
type Outcome = (CycleMode, Admission, Vec<(DeviceId, bool)>, DispatchPlan);

/// Every key, or none.
fn uniform_admission(rt: &Runtime, on: bool) -> Admission {
    Admission {
        admitted: if on { rt.admission.slot_keys().collect() } else { Vec::new() },
        ..Admission::default()
    }
}

/// Override decides everything; demand is ignored.
fn exceptional_outcome(rt: &Runtime, o: Override) -> Outcome {
    let on = o.forces_on();
    (
        CycleMode::ExceptionalActive,
        uniform_admission(rt, on),
        rt.admission.acks_all(on),
        rt.dispatcher.plan_uniform(on, Some(o)),
    )
}

fn normal_outcome(id: &str, rt: &mut Runtime, latched: &DemandSample, sink: &mut impl EventSink) -> Outcome {
    let demand = rt.admission.demand_by_key(latched);
    let admission = rt.admission.admit(&demand);

    let previous = &rt.last_admission;
    for key in &admission.admitted {
        if !previous.admitted.contains(key) {
            info!("[{}] slot {} admitted", id, key);
            sink.emit(&CoordinatorEvent::Admitted(*key));
        }
    }
    for key in &previous.admitted {
        if !admission.admitted.contains(key) {
            info!("[{}] slot {} released", id, key);
            sink.emit(&CoordinatorEvent::Released(*key));
        }
    }
    for key in &admission.waiting {
        if !previous.waiting.contains(key) {
            debug!("[{}] slot {} queued", id, key);
            sink.emit(&CoordinatorEvent::Queued(*key));
        }
    }

    let acks = rt.admission.acks(&admission, latched);
    let types = rt.admission.active_types(&admission, latched);
    let plan = rt.dispatcher.plan(&types, None);
    rt.last_admission = admission.clone();
    (CycleMode::LinkFresh, admission, acks, plan)
}

fn fallback_outcome(rt: &Runtime, latched: &DemandSample) -> Outcome {
    let decision = rt.fallback.decide();
    let (applied, acks) = match decision.acks {
        AckRule::AllOn => (uniform_admission(rt, true), rt.admission.acks_all(true)),
        AckRule::AllOff => (uniform_admission(rt, false), rt.admission.acks_all(false)),
        AckRule::FollowDemand => {
            let admitted = rt
                .admission
                .demand_by_key(latched)
                .into_iter()
                .filter_map(|(key, on)| on.then_some(key))
                .collect();
            let applied = Admission {
                admitted,
                ..Admission::default()
            };
            (applied, rt.admission.acks_uncapped(latched))
        }
    };
    (
        CycleMode::LinkStale,
        applied,
        acks,
        rt.dispatcher.plan_uniform(decision.types_active, None),
    )
}

// ───────────────────────────────────────────────────────────────
// Side effects
// ───────────────────────────────────────────────────────────────

/// Re-resolve one piece of shared equipment; log changes only.
fn reconcile(id: &str, equipment: &mut Equipment, net: &impl EquipmentPort) {
    let status = net.status(&equipment.id, equipment.kind);
    if equipment.last != Some(status) {
        match status {
            EquipmentStatus::Available => {
                info!("[{}] {:?} '{}' available", id, equipment.kind, equipment.id);
            }
            EquipmentStatus::Disabled | EquipmentStatus::Missing => {
                warn!("[{}] {:?} '{}' {:?}", id, equipment.kind, equipment.id, status);
            }
        }
        equipment.last = Some(status);
    }
}

/// Apply every invocation of the plan, containing failures.
fn apply_plan(
    plan: &DispatchPlan,
    rt: &Runtime,
    net: &mut impl NetworkPort,
    sink: &mut impl EventSink,
) -> Vec<DispatchError> {
    let mut failures = Vec::new();
    for entry in &plan.entries {
        for invocation in &entry.invocations {
            if let Err(error) = invoke(invocation, rt, net) {
                warn!("{} action skipped: {}", entry.request_type, error);
                sink.emit(&CoordinatorEvent::ActionFailed {
                    request_type: entry.request_type.clone(),
                    error: error.clone(),
                });
                failures.push(error);
            }
        }
    }
    failures
}

fn available<'a>(equipment: Option<&'a Equipment>, name: &str) -> Result<&'a DeviceId, DispatchError> {
    match equipment {
        Some(e) if e.available() => Ok(&e.id),
        Some(e) => Err(DispatchError::TargetUnavailable { id: e.id.to_string() }),
        None => Err(DispatchError::TargetUnavailable { id: name.to_string() }),
    }
}

fn invoke(invocation: &Invocation, rt: &Runtime, net: &mut impl NetworkPort) -> Result<(), DispatchError> {
    match invocation {
        Invocation::Channel { address, value } => net.write_channel(address, value),
        Invocation::Method { method, value } => match method {
            MethodKind::LogInfo => {
                info!("{}", value);
                Ok(())
            }
            MethodKind::ActivatePump => {
                let id = available(rt.pump.as_ref(), "pump")?;
                let percent = value.as_number().ok_or_else(|| DispatchError::ValueRejected {
                    target: id.to_string(),
                    value: value.to_string(),
                })?;
                net.set_pump_power(id, percent)
            }
            MethodKind::ActivateLineHeater => {
                let id = available(rt.line_heater.as_ref(), "line heater")?;
                let enable = match value {
                    ResponseValue::Null => None,
                    other => Some(other.as_bool().ok_or_else(|| DispatchError::ValueRejected {
                        target: id.to_string(),
                        value: other.to_string(),
                    })?),
                };
                net.set_line_heater(id, enable)
            }
        },
    }
}
