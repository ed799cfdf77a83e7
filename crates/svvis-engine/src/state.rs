use crossbeam::channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, MutexGuard};
use svvis_transport::Deadline;

/// Flag block shared by callers and both worker loops.
#[derive(Debug, Default)]
pub(crate) struct Flags {
    /// Peer has allowed transmission.
    pub acquisition: bool,
    /// Callers currently inside `flush`; new sends wait while non-zero.
    pub flushers: usize,
    /// Messages admitted by `send` and not yet written or discarded.
    /// The queue is drained exactly when this is zero.
    pub pending: usize,
    /// The link is gone or the engine is shutting down.
    pub closed: bool,
    /// Bumped on every acquisition off. Messages admitted under an older
    /// epoch are never written.
    pub epoch: u64,
}

/// Flags behind one mutex, a condition variable signalled on every change,
/// and a stop channel whose disconnection wakes channel waits.
pub(crate) struct EngineState {
    flags: Mutex<Flags>,
    changed: Condvar,
    stop: Mutex<Option<Sender<()>>>,
}

impl EngineState {
    pub fn new(acquisition: bool, stop: Sender<()>) -> Self {
        Self {
            flags: Mutex::new(Flags {
                acquisition,
                ..Flags::default()
            }),
            changed: Condvar::new(),
            stop: Mutex::new(Some(stop)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock()
    }

    /// Apply `update` under the lock and wake every waiter.
    pub fn update<R>(&self, update: impl FnOnce(&mut Flags) -> R) -> R {
        let result = update(&mut self.flags.lock());
        self.changed.notify_all();
        result
    }

    /// Wait while `blocked` holds. Returns false if the deadline passed first.
    pub fn wait_while(
        &self,
        flags: &mut MutexGuard<'_, Flags>,
        deadline: Deadline,
        mut blocked: impl FnMut(&Flags) -> bool,
    ) -> bool {
        while blocked(&**flags) {
            match deadline.instant() {
                None => self.changed.wait(flags),
                Some(at) => {
                    if self.changed.wait_until(flags, at).timed_out() {
                        return !blocked(&**flags);
                    }
                }
            }
        }
        true
    }

    /// Block until acquisition is on and return the current epoch.
    /// Returns `None` once closed.
    pub fn wait_acquisition(&self) -> Option<u64> {
        let mut flags = self.lock();
        self.wait_while(&mut flags, Deadline::FOREVER, |f| !f.acquisition && !f.closed);
        (!flags.closed).then_some(flags.epoch)
    }

    pub fn set_acquisition(&self, enabled: bool) {
        self.update(|flags| flags.acquisition = enabled);
    }

    /// Clear acquisition and discard everything still queued outbound.
    /// Returns the number of discarded messages.
    pub fn acquisition_off<M>(&self, queue: &Receiver<M>) -> usize {
        self.update(|flags| {
            flags.acquisition = false;
            flags.epoch = flags.epoch.wrapping_add(1);
            let drained = queue.try_iter().count();
            flags.pending = flags.pending.saturating_sub(drained);
            drained
        })
    }

    /// Wake senders waiting for queue space after the send loop took a message.
    pub fn slot_freed(&self) {
        self.update(|_| ());
    }

    /// Account for `count` admitted messages that left the engine.
    pub fn complete(&self, count: usize) {
        self.update(|flags| flags.pending = flags.pending.saturating_sub(count));
    }

    /// Mark closed and disconnect the stop channel. Returns true the first time.
    pub fn close(&self) -> bool {
        let first = self.update(|flags| !std::mem::replace(&mut flags.closed, true));
        self.stop.lock().take();
        first
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crossbeam::channel::bounded;

    use super::*;

    fn state(acquisition: bool) -> (EngineState, Receiver<()>) {
        let (stop_tx, stop_rx) = bounded(0);
        (EngineState::new(acquisition, stop_tx), stop_rx)
    }

    #[test]
    fn wait_times_out() {
        let (state, _stop) = state(false);
        let mut flags = state.lock();
        let ok = state.wait_while(
            &mut flags,
            Deadline::after(Some(Duration::from_millis(10))),
            |f| !f.acquisition,
        );
        assert!(!ok);
    }

    #[test]
    fn acquisition_wakes_waiter() {
        let (state, _stop) = state(false);
        let state = Arc::new(state);
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_acquisition())
        };
        thread::sleep(Duration::from_millis(10));
        state.set_acquisition(true);
        assert_eq!(waiter.join().unwrap(), Some(0));
    }

    #[test]
    fn close_wakes_waiter_and_disconnects_stop() {
        let (state, stop) = state(false);
        let state = Arc::new(state);
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_acquisition())
        };
        thread::sleep(Duration::from_millis(10));
        assert!(state.close());
        assert!(!state.close());
        assert_eq!(waiter.join().unwrap(), None);
        assert!(stop.recv().is_err());
        assert!(state.is_closed());
    }

    #[test]
    fn acquisition_off_drains_and_settles_pending() {
        let (state, _stop) = state(true);
        let (tx, rx) = bounded(4);
        state.update(|flags| flags.pending = 3);
        tx.send(1).unwrap();
        tx.send(2).unwrap();

        assert_eq!(state.acquisition_off(&rx), 2);
        let flags = state.lock();
        assert!(!flags.acquisition);
        assert_eq!(flags.pending, 1);
        assert_eq!(flags.epoch, 1);
        assert!(rx.is_empty());
    }

    #[test]
    fn epoch_advances_only_on_acquisition_off() {
        let (state, _stop) = state(false);
        let (_tx, rx) = bounded::<u8>(1);
        state.set_acquisition(true);
        assert_eq!(state.wait_acquisition(), Some(0));

        state.acquisition_off(&rx);
        state.set_acquisition(true);
        assert_eq!(state.wait_acquisition(), Some(1));
    }
}
