//! Simulated servo vent.
//!
//! Accepts targets from the bridge, steps the servo toward them on a tokio
//! task and reports movement and the final position back to Matter.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::state::{VentState, VentStateMachine};
use crate::bridge::{ActuatorSink, StateReporter};
use crate::matter::ids::OperationalStatus;
use crate::matter::units::{angle_to_percent100ths, percent100ths_to_angle};

pub struct SimulatedVent {
    state: Mutex<VentStateMachine>,
    reporter: OnceLock<StateReporter>,
    step_delay: Duration,
    wake: Notify,
}

impl SimulatedVent {
    pub fn new(initial_angle: u8, step_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(VentStateMachine::new(initial_angle)),
            reporter: OnceLock::new(),
            step_delay,
            wake: Notify::new(),
        })
    }

    /// Connect the vent to the bridge and publish its starting position.
    pub fn attach_reporter(&self, reporter: StateReporter) {
        let angle = self.current_angle();
        if self.reporter.set(reporter).is_ok()
            && let Some(reporter) = self.reporter.get()
        {
            reporter.report_position(angle_to_percent100ths(angle));
            reporter.report_operational_status(OperationalStatus::STOPPED);
        }
    }

    pub fn current_angle(&self) -> u8 {
        self.state.lock().current_angle()
    }

    pub fn target_angle(&self) -> u8 {
        self.state.lock().target_angle()
    }

    pub fn vent_state(&self) -> VentState {
        self.state.lock().state()
    }

    /// Run the motion loop until the task is aborted.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let vent = self.clone();
        tokio::spawn(async move {
            loop {
                vent.wake.notified().await;
                vent.drive().await;
            }
        })
    }

    /// Step to the current target, reporting moving/stopped around the motion.
    pub async fn drive(&self) {
        if !self.state.lock().is_moving() {
            return;
        }
        self.report(|r| r.report_operational_status(OperationalStatus::MOVING));

        loop {
            let stepped = self.state.lock().step();
            if !stepped {
                break;
            }
            tokio::time::sleep(self.step_delay).await;
        }

        let (angle, state) = {
            let sm = self.state.lock();
            (sm.current_angle(), sm.state())
        };
        info!("[Vent] Reached {}° ({})", angle, state.as_str());
        self.report(|r| {
            r.report_position(angle_to_percent100ths(angle));
            r.report_operational_status(OperationalStatus::STOPPED);
        });
    }

    fn report(&self, f: impl FnOnce(&StateReporter)) {
        match self.reporter.get() {
            Some(reporter) => f(reporter),
            None => debug!("[Vent] No reporter attached"),
        }
    }
}

impl ActuatorSink for SimulatedVent {
    fn on_target_position(&self, percent100ths: u16) {
        let angle = percent100ths_to_angle(percent100ths);
        let previous = self.state.lock().set_target(angle);
        info!(
            "[Vent] Target {}° -> {}° (percent100ths={})",
            previous, angle, percent100ths
        );
        self.wake.notify_one();
    }

    fn on_identify(&self, duration_s: u16) {
        if duration_s == 0 {
            info!("[Vent] Identify stopped");
        } else {
            info!("[Vent] Identify requested for {}s", duration_s);
        }
    }
}
