//! Status polling state machine for a single job id.
//!
//! `Idle -> Polling -> Settled`. The machine is the only source of truth for
//! whether another fetch should be issued: callers ask [`PollerState::should_fetch`]
//! on every tick instead of remembering the last status themselves.

use monitor_logging::monitor_warn;

use crate::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    #[default]
    Idle,
    Polling {
        last: Option<JobStatus>,
        consecutive_failures: u32,
    },
    Settled {
        status: JobStatus,
    },
}

/// Result of feeding one observation into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTransition {
    /// Still polling; the next tick should fetch again.
    Continue,
    /// The job just became terminal. Produced at most once per machine.
    Settled(JobStatus),
    /// Observation arrived after settlement and was discarded.
    Ignored,
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle -> Polling`. Returns false if polling had already begun.
    pub fn begin(&mut self) -> bool {
        if *self == PollerState::Idle {
            *self = PollerState::Polling {
                last: None,
                consecutive_failures: 0,
            };
            true
        } else {
            false
        }
    }

    pub fn should_fetch(&self) -> bool {
        matches!(self, PollerState::Polling { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, PollerState::Settled { .. })
    }

    pub fn last_status(&self) -> Option<JobStatus> {
        match *self {
            PollerState::Idle => None,
            PollerState::Polling { last, .. } => last,
            PollerState::Settled { status } => Some(status),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match *self {
            PollerState::Polling {
                consecutive_failures,
                ..
            } => consecutive_failures,
            _ => 0,
        }
    }

    /// Applies a successfully fetched status.
    ///
    /// A status that would move the lifecycle backward is discarded and the
    /// last known status is kept.
    pub fn observe(&mut self, status: JobStatus) -> PollTransition {
        self.begin();
        match *self {
            PollerState::Settled { .. } | PollerState::Idle => PollTransition::Ignored,
            PollerState::Polling { last, .. } => {
                if let Some(previous) = last {
                    if !previous.can_advance_to(status) {
                        monitor_warn!(
                            "Discarding backward status transition {} -> {}",
                            previous,
                            status
                        );
                        *self = PollerState::Polling {
                            last,
                            consecutive_failures: 0,
                        };
                        return PollTransition::Continue;
                    }
                }
                if status.is_terminal() {
                    *self = PollerState::Settled { status };
                    PollTransition::Settled(status)
                } else {
                    *self = PollerState::Polling {
                        last: Some(status),
                        consecutive_failures: 0,
                    };
                    PollTransition::Continue
                }
            }
        }
    }

    /// Records a failed fetch. Never changes the phase.
    pub fn observe_failure(&mut self) -> PollTransition {
        self.begin();
        match self {
            PollerState::Polling {
                consecutive_failures,
                ..
            } => {
                *consecutive_failures += 1;
                PollTransition::Continue
            }
            _ => PollTransition::Ignored,
        }
    }
}
