use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::{Config, GuardEvent};

/// Iterator over the public notifications a guard has queued since the last drain.
///
/// Obtain one from [`TeamKillGuard::events()`]. Events come out in the order they were
/// raised; dropping the iterator early discards whatever was not consumed.
///
/// ```ignore
/// for event in guard.events() {
///     match event {
///         GuardEvent::TeamKill(incident) => stats.record_kill(&incident),
///         GuardEvent::MassTeamKill { dead, .. } => alert_admins(dead),
///         _ => {}
///     }
/// }
/// ```
///
/// [`TeamKillGuard::events()`]: crate::TeamKillGuard::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a, T: Config> {
    drain: Drain<'a, GuardEvent<T>>,
}

impl<'a, T: Config> EventDrain<'a, T> {
    pub(crate) fn from_drain(drain: Drain<'a, GuardEvent<T>>) -> Self {
        Self { drain }
    }
}

impl<T: Config> Iterator for EventDrain<'_, T> {
    type Item = GuardEvent<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.drain.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.drain.size_hint()
    }
}

impl<T: Config> DoubleEndedIterator for EventDrain<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.drain.next_back()
    }
}

impl<T: Config> ExactSizeIterator for EventDrain<'_, T> {
    fn len(&self) -> usize {
        self.drain.len()
    }
}

impl<T: Config> FusedIterator for EventDrain<'_, T> {}

impl<T: Config> std::fmt::Debug for EventDrain<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}
