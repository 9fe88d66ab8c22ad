//! Stage lifecycle.
//!
//! Every stage runs the same three-state machine. Consumer stages share one
//! receive loop (`drive`); acquisition walks the same table from its own loop.

use std::time::{Duration, Instant};

use crate::module::channel::{Inbox, Message};
use crate::module::define;
use crate::module::error::{NightwatchError, Result};

/// Lifecycle states of a stage.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Running,
    Draining,
    Stopped,
}

/// Inputs of the lifecycle table.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Payload, // A payload was handled (successfully or with a local error)
    Stop, // Upstream stop, external stop request or closed input
    Fault, // Fatal error
    Forwarded, // Stop has been put on every output
}

impl StageState {
    /// The single transition table of all stages.
    pub fn next(self, event: StageEvent) -> StageState {
        use StageEvent as E;
        use StageState as S;
        match (self, event) {
            (S::Running, E::Payload) => S::Running,
            (S::Running, E::Stop) | (S::Running, E::Fault) => S::Draining,
            (S::Running, E::Forwarded) => S::Stopped,
            (S::Draining, E::Forwarded) => S::Stopped,
            (S::Draining, _) => S::Draining,
            (S::Stopped, _) => S::Stopped,
        }
    }
}

/// A stage that consumes one queue.
///
pub trait Stage {
    type Input;

    fn name(&self) -> &'static str;

    /// Process one payload. Fatal errors end the stage, others are logged.
    fn handle(&mut self, input: Self::Input) -> Result<()>;

    /// Put `Stop` on every output queue.
    fn close_outputs(&mut self);
}

/// Outcome of one stage run.
///
#[derive(Debug)]
pub struct StageReport {
    pub name: &'static str,
    pub processed: u64,
    pub failures: u64,
    pub state: StageState,
    pub fatal: Option<NightwatchError>,
}

impl StageReport {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            processed: 0,
            failures: 0,
            state: StageState::Running,
            fatal: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.state == StageState::Stopped
    }

    /// Apply an event to the tracked state.
    pub fn advance(&mut self, event: StageEvent) {
        let next = self.state.next(event);
        if next != self.state {
            log::debug!(
                target: self.name,
                "{}: {:?} -> {:?} on {:?}",
                self.name,
                self.state,
                next,
                event
            );
        }
        self.state = next;
    }

    /// Account for the result of one handled payload.
    pub fn record(&mut self, res: Result<()>) {
        self.processed += 1;
        match res {
            Ok(()) => self.advance(StageEvent::Payload),
            Err(e) if e.is_fatal() => {
                log::error!(target: self.name, "{}: {}", self.name, e);
                self.failures += 1;
                self.fatal = Some(e);
                self.advance(StageEvent::Fault);
            }
            Err(e) => {
                log::warn!(target: self.name, "{}: {}", self.name, e);
                self.failures += 1;
                self.advance(StageEvent::Payload);
            }
        }
    }
}

/// Run a consumer stage until its input stops, then forward the stop.
///
pub fn drive<S: Stage>(
    stage: &mut S,
    inbox: &Inbox<S::Input>,
    heartbeat: &mut Heartbeat,
) -> StageReport {
    let name = stage.name();
    let mut report = StageReport::new(name);
    log::info!(
        target: name,
        "Launch {} stage at {}",
        name,
        chrono::Local::now().format(define::naming::HEARTBEAT_FORMAT)
    );

    while report.state == StageState::Running {
        match inbox.recv() {
            Ok(Message::Payload(input)) => {
                let res = stage.handle(input);
                report.record(res);
            }
            Ok(Message::Stop) => report.advance(StageEvent::Stop),
            Err(_) => {
                log::warn!(target: name, "{}: input closed without stop", name);
                report.advance(StageEvent::Stop);
            }
        }
        heartbeat.beat(name);
    }

    stage.close_outputs();
    report.advance(StageEvent::Forwarded);
    log::info!(
        target: name,
        "... terminate {} stage ({} processed, {} failed)",
        name,
        report.processed,
        report.failures
    );
    report
}

/// Time-gated liveness line in the stage log.
///
/// Stage code logs with the stage name as target, so these lines land in
/// `<stage>.log` as well as the main log.
///
pub struct Heartbeat {
    every: Duration,
    last: Instant,
}

impl Heartbeat {
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            last: Instant::now(),
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes * 60))
    }

    /// Log "alive" if the interval has elapsed. Returns whether it did.
    pub fn beat(&mut self, name: &str) -> bool {
        if self.last.elapsed() < self.every {
            return false;
        }
        self.last = Instant::now();
        log::info!(
            target: name,
            "{} alive at {}",
            name,
            chrono::Local::now().format(define::naming::HEARTBEAT_FORMAT)
        );
        true
    }
}
