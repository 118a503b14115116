//! Length-delimited framing for RPC connections.
//!
//! Every frame is a 4-byte big-endian length followed by one `MsgPack`
//! document (`RpcCall` from the client, `RpcReply` from the server). The
//! framing layer only splits bytes; decoding the document is left to the
//! caller so that an undecodable frame can be answered instead of closing
//! the connection.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Largest accepted frame body (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Byte stream split into length-delimited frames.
pub type FramedConnection<T> = Framed<T, LengthDelimitedCodec>;

/// Codec with the RPC wire settings. Frames above `max_frame_bytes` fail
/// the stream with an I/O error.
#[must_use]
pub fn frame_codec(max_frame_bytes: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(max_frame_bytes)
        .new_codec()
}

/// Wraps `io` in the RPC framing.
pub fn framed<T>(io: T, max_frame_bytes: usize) -> FramedConnection<T>
where
    T: AsyncRead + AsyncWrite,
{
    Framed::new(io, frame_codec(max_frame_bytes))
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use super::*;

    #[test]
    fn frames_carry_big_endian_length_prefix() {
        let mut codec = frame_codec(DEFAULT_MAX_FRAME_BYTES);
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"abc"), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 3, b'a', b'b', b'c']);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"abc");
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut codec = frame_codec(DEFAULT_MAX_FRAME_BYTES);
        let mut buf = BytesMut::from(&[0u8, 0, 0, 5, b'x'][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_an_error() {
        let mut codec = frame_codec(4);
        let mut buf = BytesMut::from(&[0u8, 0, 0, 9][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[tokio::test]
    async fn framed_duplex_roundtrip() {
        use futures_util::{SinkExt, StreamExt};

        let (a, b) = tokio::io::duplex(64);
        let mut left = framed(a, DEFAULT_MAX_FRAME_BYTES);
        let mut right = framed(b, DEFAULT_MAX_FRAME_BYTES);

        left.send(Bytes::from_static(b"ping")).await.unwrap();
        let frame = right.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"ping");
    }
}
