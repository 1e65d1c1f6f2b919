// ABOUTME: Asynchronous SMPP session multiplexing requests and responses over one connection
// ABOUTME: Correlates responses by sequence number and queues unsolicited PDUs for the caller

use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::{KeepAliveConfig, KeepAliveManager};
use crate::client::sequence::{MonotonicSequence, SequenceGenerator};
use crate::codec::{Frame, MAX_SEQUENCE_NUMBER};
use crate::connection::{ConnectionError, FrameReader, FrameWriter};
use crate::datatypes::{EnquireLink, GenericNack, Unbind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// How long `close` waits for the unbind_resp.
const UNBIND_TIMEOUT: Duration = Duration::from_secs(1);

/// Attempts at finding a sequence number that is not in flight.
const MAX_SEQUENCE_DRAWS: usize = 64;

/// PDUs the peer sent that are not responses to our requests.
pub type Inbound = mpsc::UnboundedReceiver<Frame>;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Timeouts and sequence numbering for a [`Session`].
#[derive(Clone)]
pub struct SessionOptions {
    /// Longest wait for the next PDU before the read is retried.
    pub read_timeout: Duration,
    /// Longest time one frame may take to write.
    pub write_timeout: Duration,
    pub sequence: Arc<dyn SequenceGenerator>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(15 * 60),
            write_timeout: Duration::from_secs(15 * 60),
            sequence: Arc::new(MonotonicSequence::new()),
        }
    }
}

impl SessionOptions {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_sequence_generator(mut self, sequence: Arc<dyn SequenceGenerator>) -> Self {
        self.sequence = sequence;
        self
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

struct Waiter {
    ticket: u64,
    reply: oneshot::Sender<Frame>,
}

struct Shared {
    writer: tokio::sync::Mutex<FrameWriter<BoxedWriter>>,
    pending: Mutex<HashMap<u32, Waiter>>,
    inbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    sequence: Arc<dyn SequenceGenerator>,
    next_ticket: AtomicU64,
    write_timeout: Duration,
    closing: AtomicBool,
    closed: CancellationToken,
}

/// One SMPP session over a byte stream.
///
/// A background task reads frames off the stream. Responses are handed to
/// the [`submit`](Session::submit) call waiting on their sequence number and
/// everything else is queued on the [`Inbound`] receiver returned by
/// [`Session::new`]. Clones share the same connection.
///
/// ```rust,no_run
/// use smpp_receiver::client::{BindCredentials, Session, SessionOptions};
/// use std::time::Duration;
/// use tokio::net::TcpStream;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = TcpStream::connect("localhost:2775").await?;
/// let (session, mut inbound) = Session::new(stream, SessionOptions::default());
///
/// let credentials = BindCredentials::receiver("system_id", "password");
/// let response = session
///     .submit(credentials.bind_frame(), Duration::from_secs(1))
///     .await?;
/// credentials.accept_response(&response)?;
///
/// while let Some(frame) = inbound.recv().await {
///     if let Some(reply) = frame.response() {
///         session.send(&reply).await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Start a session on `io`. Must be called within a tokio runtime.
    pub fn new<T>(io: T, options: SessionOptions) -> (Session, Inbound)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            writer: tokio::sync::Mutex::new(FrameWriter::new(Box::new(write_half) as BoxedWriter)),
            pending: Mutex::new(HashMap::new()),
            inbound: Mutex::new(Some(inbound_tx)),
            sequence: options.sequence,
            next_ticket: AtomicU64::new(0),
            write_timeout: options.write_timeout,
            closing: AtomicBool::new(false),
            closed: CancellationToken::new(),
        });

        tokio::spawn(read_loop(
            shared.clone(),
            FrameReader::new(read_half),
            options.read_timeout,
        ));

        (Session { shared }, inbound_rx)
    }

    /// Send a request and wait up to `deadline` for its response.
    ///
    /// The frame's sequence number is replaced with a fresh one. The returned
    /// frame may carry an error status or be a generic_nack; checking it is
    /// up to the caller.
    pub async fn submit(&self, mut frame: Frame, deadline: Duration) -> SmppResult<Frame> {
        let command_id = frame.command_id();
        if !command_id.requires_response() {
            return Err(SmppError::InvalidData(format!(
                "{command_id:?} has no response to wait for"
            )));
        }
        if self.is_closed() {
            return Err(SmppError::ConnectionClosed);
        }

        let (reply, response) = oneshot::channel();
        let guard = self.shared.register(reply)?;
        frame.set_sequence_number(guard.sequence_number);
        trace!(?command_id, sequence_number = guard.sequence_number, "submitting request");

        self.send(&frame).await?;

        let result = match time::timeout(deadline, response).await {
            Ok(Ok(frame)) => Ok(frame),
            // Waiter dropped when the session shut down
            Ok(Err(_)) => Err(SmppError::ConnectionClosed),
            Err(_) => {
                debug!(
                    ?command_id,
                    sequence_number = guard.sequence_number,
                    "no response before deadline"
                );
                Err(SmppError::Timeout)
            }
        };
        drop(guard);
        result
    }

    /// Write one frame without waiting for anything back. Used for
    /// responses, which keep the sequence number of their request.
    pub async fn send(&self, frame: &Frame) -> SmppResult<()> {
        self.shared.send(frame).await
    }

    /// Unbind and shut the connection down.
    ///
    /// Only the first call does anything. The unbind is best effort, so the
    /// only error reported is from shutting down the transport.
    pub async fn close(&self) -> SmppResult<()> {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if !self.is_closed() {
            match self
                .submit(Frame::Unbind(Unbind::new(0)), UNBIND_TIMEOUT)
                .await
            {
                Ok(response) => debug!(status = %response.command_status(), "unbound"),
                Err(e) => debug!(error = %e, "unbind failed"),
            }
        }

        self.shared.shut_down();

        let mut writer = self.shared.writer.lock().await;
        match writer.shutdown().await.map_err(SmppError::from_io) {
            Err(SmppError::ConnectionClosed) => Ok(()),
            other => other,
        }
    }

    /// Probe the peer with enquire_link every `config.interval`.
    ///
    /// Returns `Ok` once the session closes. When `config.max_failures`
    /// consecutive probes go unanswered the session is closed and the last
    /// error is returned.
    pub async fn enquire_link(&self, config: KeepAliveConfig) -> SmppResult<()> {
        let mut manager = KeepAliveManager::new(config);
        let mut ticker = time::interval(manager.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.closed() => return Ok(()),
                _ = ticker.tick() => {}
            }

            manager.on_ping_sent();
            let probe = Frame::EnquireLink(EnquireLink::new(0));
            match self.submit(probe, manager.timeout()).await {
                Ok(_) => manager.on_ping_success(),
                Err(SmppError::ConnectionClosed) => return Ok(()),
                Err(e) => {
                    manager.on_ping_failure();
                    if manager.is_connection_failed() {
                        let status = manager.status();
                        warn!(
                            error = %e,
                            failures = status.consecutive_failures,
                            pings = status.total_pings,
                            pongs = status.total_pongs,
                            "peer stopped answering enquire_link"
                        );
                        self.close().await?;
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Resolves once the session has ended, for whatever reason.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending().len()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_requests())
            .finish()
    }
}

/// Removes a pending entry when its `submit` call finishes or is dropped.
struct PendingGuard<'a> {
    shared: &'a Shared,
    sequence_number: u32,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.shared.pending();
        // The number may already belong to a newer request
        if pending
            .get(&self.sequence_number)
            .is_some_and(|waiter| waiter.ticket == self.ticket)
        {
            pending.remove(&self.sequence_number);
        }
    }
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u32, Waiter>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, reply: oneshot::Sender<Frame>) -> SmppResult<PendingGuard<'_>> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let mut pending = self.pending();

        for _ in 0..MAX_SEQUENCE_DRAWS {
            let sequence_number = self.sequence.next_sequence();
            if !(1..=MAX_SEQUENCE_NUMBER).contains(&sequence_number)
                || pending.contains_key(&sequence_number)
            {
                continue;
            }
            pending.insert(sequence_number, Waiter { ticket, reply });
            return Ok(PendingGuard {
                shared: self,
                sequence_number,
                ticket,
            });
        }

        Err(SmppError::InvalidState(
            "no free sequence number".to_string(),
        ))
    }

    async fn send(&self, frame: &Frame) -> SmppResult<()> {
        let sequence_number = frame.sequence_number();
        if !(1..=MAX_SEQUENCE_NUMBER).contains(&sequence_number) {
            return Err(SmppError::InvalidSequence(sequence_number));
        }
        if self.closed.is_cancelled() {
            return Err(SmppError::ConnectionClosed);
        }

        let bytes = frame.to_bytes()?;
        let mut writer = self.writer.lock().await;
        let result = match time::timeout(self.write_timeout, writer.write_bytes(&bytes)).await {
            Ok(result) => result.map_err(SmppError::from_io),
            Err(_) => Err(SmppError::Timeout),
        };
        drop(writer);

        if let Err(e) = &result {
            // A partial write leaves the stream unusable
            warn!(error = %e, "write failed, ending session");
            self.shut_down();
        } else {
            trace!(command_id = ?frame.command_id(), sequence_number, "frame written");
        }
        result
    }

    /// Route a received frame to its waiter or to the inbound queue.
    fn dispatch(&self, frame: Frame) {
        if frame.is_response() {
            let waiter = self.pending().remove(&frame.sequence_number());
            if let Some(waiter) = waiter {
                // The submit may have given up already
                let _ = waiter.reply.send(frame);
                return;
            }
        }

        let inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = inbound.as_ref() {
            let _ = tx.send(frame);
        }
    }

    /// Mark the session closed, end the inbound queue and fail every waiter.
    fn shut_down(&self) {
        self.closed.cancel();
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.pending().clear();
    }
}

async fn read_loop<R>(shared: Arc<Shared>, mut reader: FrameReader<R>, read_timeout: Duration)
where
    R: AsyncRead + Unpin,
{
    loop {
        let result = tokio::select! {
            _ = shared.closed.cancelled() => break,
            result = time::timeout(read_timeout, reader.read_frame()) => result,
        };

        let frame = match result {
            Err(_) => {
                trace!("nothing received within read timeout");
                continue;
            }
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                debug!("peer closed the connection");
                break;
            }
            Ok(Err(ConnectionError::Malformed {
                sequence_number,
                status,
                source,
            })) => {
                warn!(sequence_number, error = %source, "discarding malformed PDU");
                let nack = Frame::GenericNack(GenericNack::new(status, sequence_number));
                if let Err(e) = shared.send(&nack).await {
                    debug!(error = %e, "could not nack malformed PDU");
                }
                continue;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "read failed, ending session");
                break;
            }
        };

        trace!(command_id = ?frame.command_id(), sequence_number = frame.sequence_number(), "frame received");
        shared.dispatch(frame);
    }

    shared.shut_down();
}
