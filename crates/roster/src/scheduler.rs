//! Per-channel coalescing throttle.
//!
//! ```text
//!            trigger                 timer fires
//!   Idle ─────────────▶ Pending ─────────────────▶ Running ──finish──▶ Idle
//!                          ▲                        │   ▲
//!                          │ finish         trigger │   │
//!                          └── RunningWithPending ◀─┘   │
//!                                                       │
//!   Idle / Pending ──────────── run_now ────────────────┘
//! ```
//!
//! The scheduler only decides. Spawning the timer and the refresh is up to
//! the caller, which reports back with the ticket it was handed. Tickets make
//! stale timers and runs from before a [`Scheduler::forget`] harmless.

use std::{collections::HashMap, sync::Mutex};

use {rollcall_common::ChannelId, tokio::task::AbortHandle};

/// Identifies one pending timer or one refresh run.
pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Pending,
    Running,
    RunningWithPending,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    ticket: Ticket,
    timer: Option<AbortHandle>,
}

/// What the caller must do after [`Scheduler::trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Open a window: spawn a timer for `ticket`.
    Schedule(Ticket),
    /// Absorbed by a pending or running refresh.
    Coalesced,
}

/// What the caller must do after [`Scheduler::run_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunNowOutcome {
    /// Run a refresh under `ticket` immediately.
    Run(Ticket),
    /// A refresh is already running; a trailing one has been queued.
    Coalesced,
}

/// What the caller must do after [`Scheduler::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Idle,
    /// Triggers arrived during the run: spawn a timer for `ticket`.
    Schedule(Ticket),
}

#[derive(Default)]
struct Inner {
    slots: HashMap<ChannelId, Slot>,
    next_ticket: Ticket,
}

impl Inner {
    fn issue(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }
}

#[derive(Default)]
pub struct Scheduler {
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    pub fn state(&self, channel_id: &ChannelId) -> SlotState {
        self.with_inner(|inner| {
            inner
                .slots
                .get(channel_id)
                .map_or(SlotState::Idle, |slot| slot.state)
        })
    }

    pub fn trigger(&self, channel_id: &ChannelId) -> TriggerOutcome {
        self.with_inner(|inner| {
            let ticket = inner.issue();
            let slot = inner.slots.entry(channel_id.clone()).or_insert(Slot {
                state: SlotState::Idle,
                ticket,
                timer: None,
            });
            match slot.state {
                SlotState::Idle => {
                    slot.state = SlotState::Pending;
                    slot.ticket = ticket;
                    TriggerOutcome::Schedule(ticket)
                },
                SlotState::Running => {
                    slot.state = SlotState::RunningWithPending;
                    TriggerOutcome::Coalesced
                },
                SlotState::Pending | SlotState::RunningWithPending => TriggerOutcome::Coalesced,
            }
        })
    }

    /// Run immediately unless a refresh is already in flight. A pending
    /// timer is cancelled and its work folded into this run.
    pub fn run_now(&self, channel_id: &ChannelId) -> RunNowOutcome {
        self.with_inner(|inner| {
            let ticket = inner.issue();
            let slot = inner.slots.entry(channel_id.clone()).or_insert(Slot {
                state: SlotState::Idle,
                ticket,
                timer: None,
            });
            match slot.state {
                SlotState::Idle | SlotState::Pending => {
                    if let Some(timer) = slot.timer.take() {
                        timer.abort();
                    }
                    slot.state = SlotState::Running;
                    slot.ticket = ticket;
                    RunNowOutcome::Run(ticket)
                },
                SlotState::Running => {
                    slot.state = SlotState::RunningWithPending;
                    RunNowOutcome::Coalesced
                },
                SlotState::RunningWithPending => RunNowOutcome::Coalesced,
            }
        })
    }

    /// Store the abort handle of the timer spawned for `ticket`. Returns
    /// `false` if the slot moved on in the meantime, in which case the timer
    /// will find its ticket void when it fires.
    pub fn attach_timer(&self, channel_id: &ChannelId, ticket: Ticket, timer: AbortHandle) -> bool {
        self.with_inner(|inner| match inner.slots.get_mut(channel_id) {
            Some(slot) if slot.state == SlotState::Pending && slot.ticket == ticket => {
                slot.timer = Some(timer);
                true
            },
            _ => false,
        })
    }

    /// The window of `ticket` closed. Returns the run ticket if the refresh
    /// should execute now.
    pub fn timer_fired(&self, channel_id: &ChannelId, ticket: Ticket) -> Option<Ticket> {
        self.with_inner(|inner| {
            let run = inner.issue();
            let slot = inner.slots.get_mut(channel_id)?;
            if slot.state != SlotState::Pending || slot.ticket != ticket {
                return None;
            }
            // The timer task is about to run the refresh itself; never abort it.
            slot.timer = None;
            slot.state = SlotState::Running;
            slot.ticket = run;
            Some(run)
        })
    }

    /// The run identified by `ticket` completed.
    pub fn finish(&self, channel_id: &ChannelId, ticket: Ticket) -> FinishOutcome {
        self.with_inner(|inner| {
            let next = inner.issue();
            let Some(slot) = inner.slots.get_mut(channel_id) else {
                return FinishOutcome::Idle;
            };
            if slot.ticket != ticket {
                return FinishOutcome::Idle;
            }
            match slot.state {
                SlotState::RunningWithPending => {
                    slot.state = SlotState::Pending;
                    slot.ticket = next;
                    FinishOutcome::Schedule(next)
                },
                SlotState::Running => {
                    inner.slots.remove(channel_id);
                    FinishOutcome::Idle
                },
                SlotState::Idle | SlotState::Pending => FinishOutcome::Idle,
            }
        })
    }

    /// Drop all scheduling state of a channel and abort its pending timer.
    /// A refresh already running is left to finish; its ticket is void.
    pub fn forget(&self, channel_id: &ChannelId) {
        self.with_inner(|inner| {
            if let Some(Slot {
                timer: Some(timer), ..
            }) = inner.slots.remove(channel_id)
            {
                timer.abort();
            }
        })
    }

    /// Forget every channel.
    pub fn clear(&self) {
        self.with_inner(|inner| {
            for (_, slot) in inner.slots.drain() {
                if let Some(timer) = slot.timer {
                    timer.abort();
                }
            }
        })
    }
}
