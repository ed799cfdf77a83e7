use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use svvis_frame::{write_message, Message, MessageReader};
use svvis_transport::{Deadline, Transport};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::control::ControlSignal;
use crate::error::{EngineError, Result};
use crate::state::EngineState;

/// State shared between the engine handle and its worker loops.
struct Shared<T> {
    name: String,
    transport: Arc<T>,
    state: EngineState,
    /// Serializes whole-message writes against direct control writes.
    write_lock: Mutex<()>,
}

impl<T: Transport> Shared<T> {
    fn close(&self) {
        if self.state.close() {
            info!(engine = %self.name, transport = self.transport.transport_name(), "engine closed");
        }
        self.transport.close();
    }
}

/// An outbound message tagged with the acquisition epoch it was queued under.
struct Queued {
    epoch: u64,
    msg: Message,
}

/// SvVis protocol engine bound to one transport.
///
/// Two worker threads run for the engine's lifetime. The send loop pops the
/// outbound queue and writes each message once the peer has enabled
/// acquisition. The receive loop decodes incoming bytes, applies in-band
/// acquisition control, and hands every other message to the inbound queue,
/// blocking when it is full.
///
/// All methods take `&self`; share the engine across threads with `Arc`.
pub struct Engine<T: Transport + 'static> {
    shared: Arc<Shared<T>>,
    outbound: Sender<Queued>,
    /// Receiving end of the outbound queue, used to discard on acquisition off.
    discard: Receiver<Queued>,
    inbound: Receiver<Message>,
    send_capacity: usize,
    threads: Vec<JoinHandle<()>>,
}

impl<T: Transport + 'static> Engine<T> {
    /// Take ownership of `transport` and start both worker loops.
    pub fn start(transport: T, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(transport);
        let (outbound_tx, outbound_rx) = bounded(config.send_queue_capacity);
        let (inbound_tx, inbound_rx) = bounded(config.recv_queue_capacity);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let shared = Arc::new(Shared {
            name: config.name.clone(),
            transport,
            state: EngineState::new(config.acquisition, stop_tx),
            write_lock: Mutex::new(()),
        });

        let send_handle = {
            let shared = Arc::clone(&shared);
            let queue = outbound_rx.clone();
            let stop = stop_rx.clone();
            thread::Builder::new()
                .name(format!("{}-send", config.name))
                .spawn(move || send_loop(&shared, &queue, &stop))
                .map_err(EngineError::Spawn)?
        };

        let receive_handle = {
            let shared_loop = Arc::clone(&shared);
            let queue = outbound_rx.clone();
            let stop = stop_rx.clone();
            thread::Builder::new()
                .name(format!("{}-recv", config.name))
                .spawn(move || receive_loop(&shared_loop, &queue, inbound_tx, &stop))
        };
        let receive_handle = match receive_handle {
            Ok(handle) => handle,
            Err(err) => {
                shared.close();
                let _ = send_handle.join();
                return Err(EngineError::Spawn(err));
            }
        };

        info!(
            engine = %config.name,
            transport = shared.transport.transport_name(),
            send_capacity = config.send_queue_capacity,
            recv_capacity = config.recv_queue_capacity,
            "engine started"
        );

        Ok(Self {
            shared,
            outbound: outbound_tx,
            discard: outbound_rx,
            inbound: inbound_rx,
            send_capacity: config.send_queue_capacity,
            threads: vec![send_handle, receive_handle],
        })
    }

    /// Queue a message for transmission.
    ///
    /// Fails immediately with [`EngineError::TransportClosed`] or
    /// [`EngineError::AcquisitionOff`]. Otherwise waits for any flush in
    /// progress, then for queue space, spending one `timeout` across both
    /// waits (`None` waits forever). An acquisition off while waiting for
    /// space fails the send with [`EngineError::AcquisitionOff`]; the message
    /// is never queued behind the discard.
    pub fn send(&self, msg: Message, timeout: Option<Duration>) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let state = &self.shared.state;
        let mut flags = state.lock();
        if flags.closed {
            return Err(EngineError::TransportClosed);
        }
        if !flags.acquisition {
            return Err(EngineError::AcquisitionOff);
        }
        let admitted = state.wait_while(&mut flags, deadline, |f| f.flushers > 0 && !f.closed);
        if !admitted {
            return Err(EngineError::Timeout(timeout.unwrap_or_default()));
        }
        if flags.closed {
            return Err(EngineError::TransportClosed);
        }

        // Enqueue under the flag lock; acquisition off drains under it too.
        let epoch = flags.epoch;
        let channel = msg.channel();
        flags.pending += 1;
        let mut item = Queued { epoch, msg };
        let queued = loop {
            if flags.closed {
                break Err(EngineError::TransportClosed);
            }
            if flags.epoch != epoch {
                break Err(EngineError::AcquisitionOff);
            }
            match self.outbound.try_send(item) {
                Ok(()) => break Ok(()),
                Err(TrySendError::Disconnected(_)) => break Err(EngineError::TransportClosed),
                Err(TrySendError::Full(back)) => item = back,
            }
            let space = state.wait_while(&mut flags, deadline, |f| {
                self.outbound.is_full() && f.epoch == epoch && !f.closed
            });
            if !space {
                break Err(EngineError::QueueFull {
                    capacity: self.send_capacity,
                });
            }
        };
        drop(flags);

        match &queued {
            Ok(()) => debug!(engine = %self.shared.name, channel, "message queued"),
            Err(err) => {
                state.complete(1);
                debug!(engine = %self.shared.name, channel, error = %err, "message not queued");
            }
        }
        queued
    }

    /// Queue a string message; content is truncated to 31 bytes.
    pub fn send_string(&self, text: impl AsRef<[u8]>, timeout: Option<Duration>) -> Result<()> {
        self.send(Message::string(text), timeout)
    }

    /// Queue an `i16` on integer channel `index` (`0..9`).
    pub fn send_i16(&self, index: u8, value: i16, timeout: Option<Duration>) -> Result<()> {
        let msg = Message::int16(index, value).map_err(EngineError::frame)?;
        self.send(msg, timeout)
    }

    /// Queue an `f32` on float channel `index` (`0..9`).
    pub fn send_float(&self, index: u8, value: f32, timeout: Option<Duration>) -> Result<()> {
        let msg = Message::float(index, value).map_err(EngineError::frame)?;
        self.send(msg, timeout)
    }

    /// Wait until every queued message is written, then flush the transport.
    ///
    /// New sends are held back while a flush is in progress. On timeout the
    /// hold is released, queued messages stay queued, and
    /// [`EngineError::Timeout`] is returned. The timeout bounds the queue
    /// drain; the final transport flush waits as long as the transport does.
    pub fn flush(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = Deadline::after(timeout);
        {
            let mut flags = self.shared.state.lock();
            if flags.closed {
                return Err(EngineError::TransportClosed);
            }
            flags.flushers += 1;
            let drained = self
                .shared
                .state
                .wait_while(&mut flags, deadline, |f| f.pending > 0 && !f.closed);
            if !drained || flags.closed {
                let closed = flags.closed;
                drop(flags);
                self.release_flush();
                return Err(if closed {
                    EngineError::TransportClosed
                } else {
                    EngineError::Timeout(timeout.unwrap_or_default())
                });
            }
        }

        let flushed = {
            let _write = self.shared.write_lock.lock();
            self.shared.transport.flush()
        };
        self.release_flush();
        debug!(engine = %self.shared.name, "flushed");
        flushed.map_err(EngineError::link)
    }

    fn release_flush(&self) {
        self.shared
            .state
            .update(|flags| flags.flushers = flags.flushers.saturating_sub(1));
    }

    /// Whether the peer currently allows transmission.
    pub fn acquisition_enabled(&self) -> bool {
        self.shared.state.lock().acquisition
    }

    /// Set the local acquisition state without a control message.
    ///
    /// Turning it off discards the outbound queue, exactly as a received OFF
    /// signal does.
    pub fn force_acquisition(&self, enabled: bool) {
        if enabled {
            self.shared.state.set_acquisition(true);
        } else {
            let dropped = self.shared.state.acquisition_off(&self.discard);
            if dropped > 0 {
                debug!(engine = %self.shared.name, dropped, "outbound queue discarded");
            }
        }
        info!(engine = %self.shared.name, enabled, "acquisition forced");
    }

    /// Ask the peer to start or stop transmitting.
    ///
    /// Writes the control message directly to the transport, bypassing the
    /// outbound queue and the local acquisition gate. `timeout` bounds the
    /// wait for a message write already in progress.
    pub fn request_acquisition(&self, enabled: bool, timeout: Option<Duration>) -> Result<()> {
        if self.shared.state.is_closed() {
            return Err(EngineError::TransportClosed);
        }
        let _write = match timeout {
            None => self.shared.write_lock.lock(),
            Some(timeout) => self
                .shared
                .write_lock
                .try_lock_for(timeout)
                .ok_or(EngineError::Timeout(timeout))?,
        };
        let signal = ControlSignal::from_state(enabled);
        write_message(&*self.shared.transport, &signal.to_message()).map_err(EngineError::frame)?;
        info!(engine = %self.shared.name, enabled, "acquisition requested from peer");
        Ok(())
    }

    /// Number of received messages waiting in the inbound queue.
    pub fn available(&self) -> usize {
        self.inbound.len()
    }

    /// Number of messages waiting in the outbound queue.
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// Take the next received message.
    ///
    /// Returns `Ok(None)` when `timeout` elapses and
    /// [`EngineError::TransportClosed`] once the receive loop has ended and
    /// every message it delivered has been taken.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<Option<Message>> {
        match timeout {
            None => self
                .inbound
                .recv()
                .map(Some)
                .map_err(|_| EngineError::TransportClosed),
            Some(timeout) => match self.inbound.recv_timeout(timeout) {
                Ok(msg) => Ok(Some(msg)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(EngineError::TransportClosed),
            },
        }
    }

    /// Take a received message if one is already waiting.
    pub fn try_receive(&self) -> Result<Option<Message>> {
        self.receive(Some(Duration::ZERO))
    }

    /// Whether the link is gone.
    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }

    /// Engine name from its config.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The transport this engine drives.
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Close the transport and wait for both worker loops to exit.
    pub fn shutdown(mut self) {
        self.shared.close();
        for handle in std::mem::take(&mut self.threads) {
            if handle.join().is_err() {
                warn!(engine = %self.shared.name, "engine thread panicked");
            }
        }
    }
}

impl<T: Transport + 'static> Drop for Engine<T> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.shared.name)
            .field("transport", &self.shared.transport.transport_name())
            .field("queued", &self.queued())
            .field("available", &self.available())
            .finish()
    }
}

fn send_loop<T: Transport>(shared: &Shared<T>, queue: &Receiver<Queued>, stop: &Receiver<()>) {
    loop {
        let Queued { epoch, msg } = select! {
            recv(queue) -> item => match item {
                Ok(item) => item,
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        };
        shared.state.slot_freed();

        match shared.state.wait_acquisition() {
            None => break,
            Some(current) if current != epoch => {
                // Taken before an acquisition off; the peer discarded it.
                shared.state.complete(1);
                debug!(engine = %shared.name, channel = msg.channel(), "stale message dropped");
                continue;
            }
            Some(_) => {}
        }

        let written = {
            let _write = shared.write_lock.lock();
            write_message(&*shared.transport, &msg)
        };
        shared.state.complete(1);

        match written {
            Ok(()) => debug!(
                engine = %shared.name,
                channel = msg.channel(),
                len = msg.wire_len(),
                "message sent"
            ),
            Err(err) if err.is_closed() => {
                info!(engine = %shared.name, "transport closed while sending");
                shared.close();
                break;
            }
            Err(err) => warn!(
                engine = %shared.name,
                channel = msg.channel(),
                error = %err,
                "message write failed"
            ),
        }
    }
    debug!(engine = %shared.name, "send loop exited");
}

fn receive_loop<T: Transport>(
    shared: &Shared<T>,
    outbound: &Receiver<Queued>,
    inbound: Sender<Message>,
    stop: &Receiver<()>,
) {
    let mut reader = MessageReader::new(Arc::clone(&shared.transport));
    loop {
        let msg = match reader.read_message(None) {
            Ok(msg) => msg,
            Err(err) if err.is_timeout() => continue,
            Err(err) if err.is_closed() => {
                info!(engine = %shared.name, "transport closed");
                break;
            }
            Err(err) => {
                warn!(engine = %shared.name, error = %err, "receive failed");
                break;
            }
        };

        match ControlSignal::from_message(&msg) {
            Some(ControlSignal::On) => {
                shared.state.set_acquisition(true);
                info!(engine = %shared.name, "acquisition on");
            }
            Some(ControlSignal::Off) => {
                let dropped = shared.state.acquisition_off(outbound);
                info!(engine = %shared.name, dropped, "acquisition off");
            }
            None => {
                debug!(
                    engine = %shared.name,
                    channel = msg.channel(),
                    len = msg.wire_len(),
                    "message received"
                );
                let delivered = select! {
                    send(inbound, msg) -> res => res.is_ok(),
                    recv(stop) -> _ => false,
                };
                if !delivered {
                    break;
                }
            }
        }
    }
    shared.close();
    debug!(engine = %shared.name, "receive loop exited");
}
