// ABOUTME: End-to-end tests of the receiver against a scripted SMSC
// ABOUTME: Covers binding, multipart delivery to the hook, keep-alive failure and reconnects

use bytes::Bytes;
use serde_json::json;
use smpp_receiver::client::SmppError;
use smpp_receiver::connection::{FrameReader, FrameWriter};
use smpp_receiver::datatypes::tlv::{Tlv, tags};
use smpp_receiver::datatypes::{
    BindReceiverResponse, BindTransmitter, CommandStatus, DeliverSm, DeliverSmResponse,
    EnquireLink, EnquireLinkResponse, GenericNack,
};
use smpp_receiver::receiver::supervisor::{self, serve};
use smpp_receiver::receiver::{Configuration, Device, HookSink};
use smpp_receiver::Frame;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn device(smsc: &str, keep_alive_tick_ms: u64) -> Device {
    let config = json!({
        "hook": "/bin/true",
        "devices": [{
            "smsc": smsc,
            "system_id": "gw1",
            "password": "pw",
            "owner": "ops",
            "keep_alive_tick_ms": keep_alive_tick_ms,
            "keep_alive_timeout_ms": 1000
        }]
    });
    Configuration::from_json(&config.to_string())
        .unwrap()
        .devices
        .remove(0)
}

struct Smsc<T> {
    rx: FrameReader<ReadHalf<T>>,
    tx: FrameWriter<WriteHalf<T>>,
}

impl<T: AsyncRead + AsyncWrite> Smsc<T> {
    fn new(io: T) -> Self {
        let (r, w) = tokio::io::split(io);
        Smsc {
            rx: FrameReader::new(r),
            tx: FrameWriter::new(w),
        }
    }

    async fn recv(&mut self) -> Frame {
        self.rx.read_frame().await.unwrap().unwrap()
    }

    async fn send(&mut self, frame: Frame) {
        self.tx.write_frame(&frame).await.unwrap();
    }

    /// Answer the bind with `status`.
    async fn accept_bind(&mut self, status: CommandStatus) {
        let bind = self.recv().await;
        let Frame::BindReceiver(bind) = bind else {
            panic!("expected bind_receiver, got {bind:?}");
        };
        assert_eq!(bind.system_id, "gw1");
        assert_eq!(bind.password.as_deref(), Some("pw"));

        let response = if status.is_ok() {
            BindReceiverResponse::new(bind.sequence_number, "SMSC")
        } else {
            BindReceiverResponse::error(bind.sequence_number, status)
        };
        self.send(Frame::BindReceiverResp(response)).await;
    }
}

fn segment(sequence_number: u32, index: u8, text: &str) -> DeliverSm {
    DeliverSm {
        sequence_number,
        source_addr: "447700900000".to_string(),
        destination_addr: "1234".to_string(),
        short_message: Bytes::copy_from_slice(text.as_bytes()),
        tlvs: vec![
            Tlv::from_u16(tags::SAR_MSG_REF_NUM, 7),
            Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, 2),
            Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, index),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn delivers_multipart_message_and_unbinds_on_shutdown() {
    let (client, server) = tokio::io::duplex(4096);
    let (sink, mut payloads) = HookSink::channel();
    let shutdown = CancellationToken::new();

    let session = tokio::spawn({
        let shutdown = shutdown.clone();
        let device = device("10.0.0.1:2775", 60_000);
        async move { serve(client, &device, &sink, &shutdown).await }
    });

    let mut smsc = Smsc::new(server);
    smsc.accept_bind(CommandStatus::Ok).await;

    // Second part first
    smsc.send(Frame::from(segment(11, 2, " world"))).await;
    smsc.send(Frame::from(segment(10, 1, "hello"))).await;
    for sequence_number in [11, 10] {
        assert_eq!(
            smsc.recv().await,
            Frame::DeliverSmResp(DeliverSmResponse::new(sequence_number))
        );
    }

    let payload = payloads.recv().await.unwrap();
    assert_eq!(payload.message, "hello world");
    assert_eq!(payload.source, "447700900000");
    assert_eq!(payload.target, "1234");
    assert_eq!(payload.smsc, "10.0.0.1:2775");
    assert_eq!(payload.system_id, "gw1");
    assert_eq!(payload.owner, "ops");

    smsc.send(Frame::EnquireLink(EnquireLink::new(12))).await;
    assert_eq!(
        smsc.recv().await,
        Frame::EnquireLinkResp(EnquireLinkResponse::new(12))
    );

    // Requests without a response of their own are nacked
    let bind = BindTransmitter {
        sequence_number: 13,
        system_id: "x".to_string(),
        ..Default::default()
    };
    smsc.send(Frame::BindTransmitter(bind)).await;
    assert_eq!(
        smsc.recv().await,
        Frame::GenericNack(GenericNack::invalid_command_id(13))
    );

    shutdown.cancel();
    let unbind = smsc.recv().await;
    assert!(matches!(unbind, Frame::Unbind(_)));
    smsc.send(unbind.response().unwrap()).await;

    session.await.unwrap().unwrap();
    assert!(payloads.try_recv().is_err());
}

#[tokio::test]
async fn rejected_bind_ends_session() {
    let (client, server) = tokio::io::duplex(4096);
    let (sink, _payloads) = HookSink::channel();
    let shutdown = CancellationToken::new();

    let session = tokio::spawn(async move {
        let device = device("10.0.0.1:2775", 60_000);
        serve(client, &device, &sink, &shutdown).await
    });

    let mut smsc = Smsc::new(server);
    smsc.accept_bind(CommandStatus::BindFailed).await;
    drop(smsc);

    assert!(matches!(
        session.await.unwrap(),
        Err(SmppError::Protocol(CommandStatus::BindFailed))
    ));
}

#[tokio::test]
async fn peer_hangup_is_a_clean_disconnect() {
    let (client, server) = tokio::io::duplex(4096);
    let (sink, _payloads) = HookSink::channel();
    let shutdown = CancellationToken::new();

    let session = tokio::spawn(async move {
        let device = device("10.0.0.1:2775", 60_000);
        serve(client, &device, &sink, &shutdown).await
    });

    let mut smsc = Smsc::new(server);
    smsc.accept_bind(CommandStatus::Ok).await;
    drop(smsc);

    session.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn silent_peer_fails_keep_alive() {
    let (client, server) = tokio::io::duplex(4096);
    let (sink, _payloads) = HookSink::channel();
    let shutdown = CancellationToken::new();

    let session = tokio::spawn(async move {
        let device = device("10.0.0.1:2775", 500);
        serve(client, &device, &sink, &shutdown).await
    });

    let mut smsc = Smsc::new(server);
    smsc.accept_bind(CommandStatus::Ok).await;

    // Read the probe but never answer it
    assert!(matches!(smsc.recv().await, Frame::EnquireLink(_)));

    assert!(matches!(session.await.unwrap(), Err(SmppError::Timeout)));
}

#[tokio::test]
async fn supervisor_reconnects_after_failed_bind() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (sink, _payloads) = HookSink::channel();
    let shutdown = CancellationToken::new();

    let supervisor = tokio::spawn(supervisor::run(
        device(&address, 60_000),
        sink,
        shutdown.clone(),
    ));

    let (stream, _) = listener.accept().await.unwrap();
    let mut smsc = Smsc::new(stream);
    smsc.accept_bind(CommandStatus::InvalidPassword).await;
    drop(smsc);

    let started = tokio::time::Instant::now();
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(900));

    let mut smsc = Smsc::new(stream);
    smsc.accept_bind(CommandStatus::Ok).await;

    shutdown.cancel();
    let unbind = smsc.recv().await;
    assert!(matches!(unbind, Frame::Unbind(_)));
    smsc.send(unbind.response().unwrap()).await;

    tokio::time::timeout(Duration::from_secs(5), supervisor)
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn configuration_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let config = json!({
        "hook": "/usr/local/bin/sms-hook",
        "hook_mode": "ndjson",
        "devices": [
            { "smsc": "10.0.0.1:2775", "system_id": "gw1", "password": "pw" },
            { "smsc": "10.0.0.2:2775" }
        ]
    });
    write!(file, "{config}").unwrap();

    let config = Configuration::load(file.path()).unwrap();
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[1].system_id, "gw1");
    assert_eq!(config.devices[1].smsc, "10.0.0.2:2775");
}

#[test]
fn malformed_configuration_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"hook\": ").unwrap();

    let err = Configuration::load(file.path()).unwrap_err();
    assert!(matches!(err, smpp_receiver::receiver::ConfigError::Json(_)));
}
