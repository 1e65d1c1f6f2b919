// ABOUTME: Keeps one SMSC device connected and bound, reconnecting after every failure
// ABOUTME: Acknowledges inbound PDUs and forwards completed messages to the hook sink

use crate::assembler::{MultipartCombiner, assemble};
use crate::client::{Session, SmppError, SmppResult};
use crate::codec::Frame;
use crate::datatypes::{DeliverSm, DeliverSmResponse, GenericNack};
use crate::receiver::config::Device;
use crate::receiver::hook::{HookSink, Payload};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Pause between a session ending and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Deadline for the SMSC to answer the bind.
const BIND_TIMEOUT: Duration = Duration::from_secs(5);

/// Incomplete multipart messages older than this are discarded.
const MULTIPART_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Connect, bind and serve `device` until `shutdown` is cancelled.
///
/// Failures of any kind end the current session only; the loop waits
/// [`RECONNECT_DELAY`] and starts over.
pub async fn run(device: Device, hook: HookSink, shutdown: CancellationToken) {
    let span = info_span!("device", smsc = %device.smsc, system_id = %device.system_id);

    async move {
        while !shutdown.is_cancelled() {
            match connect(&device, &hook, &shutdown).await {
                Ok(()) => info!("disconnected"),
                Err(e) => error!(error = %e, "session ended"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
        debug!("supervisor stopped");
    }
    .instrument(span)
    .await
}

async fn connect(device: &Device, hook: &HookSink, shutdown: &CancellationToken) -> SmppResult<()> {
    let stream = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        stream = TcpStream::connect(&device.smsc) => stream?,
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "cannot disable Nagle");
    }
    serve(stream, device, hook, shutdown).await
}

/// Run one session for `device` over an already open transport: bind, then
/// answer PDUs until the session ends or `shutdown` is cancelled.
pub async fn serve<T>(
    io: T,
    device: &Device,
    hook: &HookSink,
    shutdown: &CancellationToken,
) -> SmppResult<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (session, mut inbound) = Session::new(io, device.session_options());

    let credentials = device.credentials();
    let bound = match session.submit(credentials.bind_frame(), BIND_TIMEOUT).await {
        Ok(response) => credentials.accept_response(&response),
        Err(e) => Err(e),
    };
    let smsc_system_id = match bound {
        Ok(id) => id,
        Err(e) => {
            close(&session).await;
            return Err(e);
        }
    };
    info!(smsc_system_id = %smsc_system_id, bind = ?device.bind_mode, "connected");

    let keep_alive = tokio::spawn(
        {
            let session = session.clone();
            let config = device.keep_alive();
            async move { session.enquire_link(config).await }
        }
        .in_current_span(),
    );

    let mut combiner = MultipartCombiner::new();
    let result = loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            frame = inbound.recv() => match frame {
                Some(frame) => frame,
                None => break Ok(()),
            },
        };

        if let Err(e) = handle(&session, frame, device, hook, &mut combiner).await {
            break Err(e);
        }
    };

    close(&session).await;

    // A dead peer found by enquire_link explains the end of the session
    match (result, keep_alive.await) {
        (Ok(()) | Err(SmppError::ConnectionClosed), Ok(Err(e))) => Err(e),
        (result, Ok(_)) => result,
        (result, Err(e)) => {
            warn!(error = %e, "keep-alive task failed");
            result
        }
    }
}

async fn handle(
    session: &Session,
    frame: Frame,
    device: &Device,
    hook: &HookSink,
    combiner: &mut MultipartCombiner,
) -> SmppResult<()> {
    let reply = match frame {
        Frame::DeliverSm(pdu) => {
            let reply = Frame::DeliverSmResp(DeliverSmResponse::new(pdu.sequence_number));
            deliver(*pdu, device, hook, combiner);
            reply
        }
        frame if frame.is_response() => {
            debug!(
                command_id = ?frame.command_id(),
                sequence_number = frame.sequence_number(),
                "dropping response without a pending request"
            );
            return Ok(());
        }
        frame => {
            debug!(command_id = ?frame.command_id(), "answering request");
            frame.response().unwrap_or_else(|| {
                Frame::GenericNack(GenericNack::invalid_command_id(frame.sequence_number()))
            })
        }
    };

    session.send(&reply).await
}

fn deliver(pdu: DeliverSm, device: &Device, hook: &HookSink, combiner: &mut MultipartCombiner) {
    let evicted = combiner.evict_stale(MULTIPART_MAX_AGE);
    if evicted > 0 {
        warn!(evicted, "discarded incomplete multipart messages");
    }

    let Some(segments) = combiner.push(pdu) else {
        return;
    };

    match assemble(&segments, device.workaround) {
        Ok(message) => {
            info!(source = %message.source, target = %message.target, "message received");
            hook.emit(Payload::new(device, message));
        }
        Err(e) => {
            warn!(error = %e, source = %segments[0].source_addr, "cannot decode message");
        }
    }
}

async fn close(session: &Session) {
    if let Err(e) = session.close().await {
        match e {
            SmppError::ConnectionClosed => {}
            e => debug!(error = %e, "closing session failed"),
        }
    }
}
