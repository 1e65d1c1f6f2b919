// ABOUTME: Frame-based I/O over any async byte stream for SMPP v3.4 sessions
// ABOUTME: Buffers reads until a whole PDU is present and recovers from undecodable PDUs

use crate::codec::{CodecError, Frame, PduHeader};
use crate::datatypes::CommandStatus;
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Errors from reading frames off the transport
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the stream part way through a frame.
    #[error("connection reset by peer")]
    Reset,

    /// A complete frame that could not be decoded. It has been skipped and
    /// the stream is still usable; answer it with a generic_nack.
    #[error("malformed PDU (sequence {sequence_number}): {source}")]
    Malformed {
        sequence_number: u32,
        status: CommandStatus,
        #[source]
        source: CodecError,
    },

    /// command_length is out of range, so frame boundaries are lost.
    #[error("cannot find frame boundary: {0}")]
    Unframeable(#[source] CodecError),
}

/// Reading half of an SMPP connection.
///
/// ## Session states (SMPP v3.4 Section 2.1)
///
/// ```text
/// CLOSED → OPEN → BOUND_TX/BOUND_RX/BOUND_TRX → UNBOUND → CLOSED
/// ```
///
/// The reader only frames PDUs. Tracking the bind state is left to the
/// session and supervisor on top of it.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> FrameReader<R> {
        FrameReader {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the stream is closed in
    /// a way that doesn't break a frame in half, it returns `None`.
    ///
    /// Cancel safe: partially received frames stay in the buffer.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // For this to be a clean shutdown, there should be no data in
                // the read buffer.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ConnectionError::Reset)
                };
            }
        }
    }

    /// Tries to parse a frame from the buffer. A complete frame is removed
    /// from the buffer whether or not it decodes.
    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut buf = Cursor::new(&self.buffer[..]);

        let len = match Frame::check(&mut buf) {
            Ok(len) => len,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(ConnectionError::Unframeable(e)),
        };

        let result = Frame::parse(&mut buf);
        let sequence_number = raw_sequence_number(&self.buffer);
        self.buffer.advance(len);

        match result {
            Ok(frame) => Ok(Some(frame)),
            Err(source) => Err(ConnectionError::Malformed {
                sequence_number,
                status: source.to_command_status(),
                source,
            }),
        }
    }
}

/// sequence_number of the frame at the start of `buf`, read without
/// validation. Only call once a full header is buffered.
fn raw_sequence_number(buf: &[u8]) -> u32 {
    let mut header = &buf[12..PduHeader::SIZE];
    header.get_u32()
}

/// Writing half of an SMPP connection, buffered so one frame is one flush.
#[derive(Debug)]
pub struct FrameWriter<W> {
    stream: BufWriter<W>,
    scratch: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> FrameWriter<W> {
        FrameWriter {
            stream: BufWriter::new(stream),
            scratch: BytesMut::with_capacity(1024),
        }
    }

    /// Write a single `Frame` value to the underlying stream and flush it.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.scratch.clear();
        frame
            .encode(&mut self.scratch)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        self.stream.write_all(&self.scratch).await?;
        self.stream.flush().await
    }

    /// Write an already encoded frame and flush it.
    pub async fn write_bytes(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{EnquireLink, GenericNack, Unbind};

    #[tokio::test]
    async fn frames_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer
            .write_frame(&Frame::EnquireLink(EnquireLink::new(5)))
            .await
            .unwrap();
        writer
            .write_frame(&Frame::Unbind(Unbind::new(6)))
            .await
            .unwrap();
        drop(writer);

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Some(Frame::EnquireLink(EnquireLink::new(5)))
        );
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Some(Frame::Unbind(Unbind::new(6)))
        );
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn frame_split_across_reads() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);
        let bytes = EnquireLink::new(9).to_bytes().unwrap();

        let read = tokio::spawn(async move { reader.read_frame().await });
        client.write_all(&bytes[..5]).await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(&bytes[5..]).await.unwrap();

        let frame = read.await.unwrap().unwrap();
        assert_eq!(frame, Some(Frame::EnquireLink(EnquireLink::new(9))));
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(server);

        // cancel_sm is not decoded by this crate
        let mut data: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x12, // command_length (18)
            0x00, 0x00, 0x00, 0x08, // command_id (CancelSm)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x21, // sequence_number
            0x00, 0x00,
        ];
        data.extend_from_slice(&EnquireLink::new(34).to_bytes().unwrap());
        client.write_all(&data).await.unwrap();
        drop(client);

        match reader.read_frame().await {
            Err(ConnectionError::Malformed {
                sequence_number,
                status,
                ..
            }) => {
                assert_eq!(sequence_number, 0x21);
                assert_eq!(status, CommandStatus::InvalidCommandId);
            }
            other => panic!("expected malformed frame, got {other:?}"),
        }
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Some(Frame::EnquireLink(EnquireLink::new(34)))
        );
    }

    #[tokio::test]
    async fn bad_length_is_unframeable() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        client
            .write_all(&[0x00, 0x00, 0x00, 0x04, 0, 0, 0, 0x15, 0, 0, 0, 0, 0, 0, 0, 1])
            .await
            .unwrap();

        assert!(matches!(
            reader.read_frame().await,
            Err(ConnectionError::Unframeable(_))
        ));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_reset() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        let bytes = GenericNack::system_error(1).to_bytes().unwrap();
        client.write_all(&bytes[..10]).await.unwrap();
        drop(client);

        assert!(matches!(reader.read_frame().await, Err(ConnectionError::Reset)));
    }
}
