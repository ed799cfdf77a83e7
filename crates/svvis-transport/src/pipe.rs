use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::Deadline;

/// Fixed-capacity single-producer/single-consumer blocking byte queue.
///
/// Decouples an asynchronous byte source (a receive interrupt, a socket read
/// loop) from the one thread that consumes the bytes. Capacity is fixed at
/// construction and never changes.
///
/// Interrupt-context producers must use [`try_put`](RingPipe::try_put), which
/// never blocks; bytes that do not fit are counted in
/// [`dropped`](RingPipe::dropped) instead.
pub struct RingPipe {
    state: Mutex<PipeState>,
    /// Signalled when a byte arrives or the pipe closes.
    readable: Condvar,
    /// Signalled when a slot frees, put is toggled, or the pipe closes.
    writable: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

struct PipeState {
    bytes: VecDeque<u8>,
    put_enabled: bool,
    closed: bool,
}

impl RingPipe {
    /// Allocate a pipe holding up to `capacity` bytes.
    ///
    /// Fails with [`TransportError::AllocationFailure`] if the storage cannot
    /// be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TransportError::ZeroCapacity);
        }

        let mut bytes = VecDeque::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| TransportError::AllocationFailure { capacity })?;

        debug!(capacity, "ring pipe allocated");

        Ok(Self {
            state: Mutex::new(PipeState {
                bytes,
                put_enabled: true,
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    /// Permit or forbid further puts. Already-buffered bytes stay readable.
    pub fn enable_put(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.put_enabled = enabled;
        drop(state);
        // Blocked producers must observe the switch.
        self.writable.notify_all();
        trace!(enabled, "ring pipe put switch");
    }

    /// Put one byte, blocking until a slot is free or the timeout elapses.
    pub fn put(&self, byte: u8, timeout: Option<Duration>) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(TransportError::Closed);
            }
            if !state.put_enabled {
                return Err(TransportError::PutDisabled);
            }
            if state.bytes.len() < self.capacity {
                state.bytes.push_back(byte);
                drop(state);
                self.readable.notify_one();
                return Ok(());
            }
            wait(&self.writable, &mut state, deadline)?;
        }
    }

    /// Put one byte without blocking.
    ///
    /// Safe to call from an interrupt-style context. A full pipe drops the
    /// byte, bumps the dropped counter and returns [`TransportError::Full`].
    pub fn try_put(&self, byte: u8) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if !state.put_enabled {
            return Err(TransportError::PutDisabled);
        }
        if state.bytes.len() >= self.capacity {
            drop(state);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(TransportError::Full);
        }
        state.bytes.push_back(byte);
        drop(state);
        self.readable.notify_one();
        Ok(())
    }

    /// Pop the oldest byte, blocking until one arrives or the timeout elapses.
    ///
    /// Bytes buffered before [`close`](RingPipe::close) are still returned;
    /// after that the pipe reports [`TransportError::Closed`].
    pub fn pop(&self, timeout: Option<Duration>) -> Result<u8> {
        let deadline = Deadline::after(timeout);
        let mut state = self.state.lock();
        loop {
            if let Some(byte) = state.bytes.pop_front() {
                drop(state);
                self.writable.notify_all();
                return Ok(byte);
            }
            if state.closed {
                return Err(TransportError::Closed);
            }
            wait(&self.readable, &mut state, deadline)?;
        }
    }

    /// Block until the consumer has taken every buffered byte.
    pub fn wait_empty(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let mut state = self.state.lock();
        loop {
            if state.bytes.is_empty() {
                return Ok(());
            }
            if state.closed {
                return Err(TransportError::Closed);
            }
            wait(&self.writable, &mut state, deadline)?;
        }
    }

    /// Close the pipe and wake every waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.readable.notify_all();
        self.writable.notify_all();
        debug!("ring pipe closed");
    }

    /// Snapshot: no byte is buffered. Racy by nature.
    pub fn is_empty(&self) -> bool {
        self.state.lock().bytes.is_empty()
    }

    /// Snapshot of the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }

    /// Fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes lost because [`try_put`](RingPipe::try_put) found the pipe full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether [`close`](RingPipe::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether puts are currently permitted.
    pub fn is_put_enabled(&self) -> bool {
        self.state.lock().put_enabled
    }
}

impl std::fmt::Debug for RingPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RingPipe")
            .field("capacity", &self.capacity)
            .field("len", &state.bytes.len())
            .field("put_enabled", &state.put_enabled)
            .field("closed", &state.closed)
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

fn wait(cond: &Condvar, state: &mut MutexGuard<'_, PipeState>, deadline: Deadline) -> Result<()> {
    match deadline.instant() {
        None => {
            cond.wait(state);
            Ok(())
        }
        Some(at) => {
            if Instant::now() >= at {
                return Err(TransportError::Timeout);
            }
            // Spurious and real wakeups alike re-check the state in the caller.
            let _ = cond.wait_until(state, at);
            Ok(())
        }
    }
}
