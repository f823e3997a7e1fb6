//! Cooperative delayed-task queue.
//!
//! Nothing in the guard blocks or sleeps. Work that has to wait for the world to settle is
//! queued here with a due time and released by [`TeamKillGuard::poll`]. Every task carries
//! the [`RoundId`] it was scheduled in; tasks from a previous round are dropped unexecuted.
//!
//! [`TeamKillGuard::poll`]: crate::TeamKillGuard::poll

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;
use web_time::Instant;

use crate::player::PlayerSnapshot;
use crate::{Config, EffectId, PlayerId, RoundId, TrapId, UserId};

/// A potential target of a lethal area effect as seen when the effect was created.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MassTarget {
    /// The target.
    pub player: PlayerId,
    /// Hostile fire from the effect's owner, or the owner themself.
    pub friendly: bool,
    /// Whether this target is the effect's owner.
    pub is_actor: bool,
}

/// Everything the settle check of one area effect needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MassCheck {
    /// The effect.
    pub effect: EffectId,
    /// Account id of the attributed owner.
    pub actor: UserId,
    /// Targets at creation time.
    pub targets: SmallVec<[MassTarget; 8]>,
}

/// Payload of a delayed task.
#[derive(Debug, Clone, PartialEq)]
pub enum Task<T: Config> {
    /// Drop a deceased record if it is still the one created at `created_at`.
    ExpireDeceased {
        /// Scheduling round.
        round: RoundId,
        /// Whose record.
        player: PlayerId,
        /// Creation time of the record.
        created_at: Instant,
    },
    /// Drop a trap trigger if it is still the one from `triggered_at`.
    ExpireTrap {
        /// Scheduling round.
        round: RoundId,
        /// The trap.
        trap: TrapId,
        /// Trigger time.
        triggered_at: Instant,
    },
    /// Verify an area effect once its damage has landed.
    SettleAreaEffect {
        /// Scheduling round.
        round: RoundId,
        /// The check.
        check: MassCheck,
    },
    /// Count an offender's team kills and apply the matching tier.
    EvaluatePunishment {
        /// Scheduling round.
        round: RoundId,
        /// Offender as of the triggering incident.
        offender: PlayerSnapshot<T>,
    },
}

impl<T: Config> Task<T> {
    /// Round the task was scheduled in.
    #[must_use]
    pub const fn round(&self) -> RoundId {
        match self {
            Self::ExpireDeceased { round, .. }
            | Self::ExpireTrap { round, .. }
            | Self::SettleAreaEffect { round, .. }
            | Self::EvaluatePunishment { round, .. } => *round,
        }
    }
}

#[derive(Debug)]
struct Scheduled<T: Config> {
    due: Instant,
    seq: u64,
    task: Task<T>,
}

impl<T: Config> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T: Config> Eq for Scheduled<T> {}

impl<T: Config> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Config> Ord for Scheduled<T> {
    // reversed: BinaryHeap is a max-heap and the earliest task must surface first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Tasks ordered by due time, ties broken by scheduling order.
#[derive(Debug)]
pub struct TaskQueue<T: Config> {
    heap: BinaryHeap<Scheduled<T>>,
    next_seq: u64,
}

impl<T: Config> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> TaskQueue<T> {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Queues `task` to run at or after `due`.
    pub fn schedule(&mut self, due: Instant, task: Task<T>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due, seq, task });
    }

    /// Removes and returns the earliest task due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<Task<T>> {
        if self.heap.peek().is_some_and(|s| s.due <= now) {
            return self.heap.pop().map(|s| s.task);
        }
        None
    }

    /// Due time of the earliest queued task.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|s| s.due)
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
