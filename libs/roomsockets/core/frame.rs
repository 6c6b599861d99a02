//! Minimal WebSocket frame codec (RFC 6455 subset)
//!
//! ```text
//!  0               1               2               3
//! +-+-------+-+-------------+-------------------------------+
//! |F| rsv + |M| Payload len |    Extended payload length    |
//! |I| opcode|A|     (7)     |            (16/64)            |
//! |N|  (4)  |S|             |   (if payload len==126/127)   |
//! +-+-------+-+-------------+-------------------------------+
//! |  Masking key (0 or 4 bytes)  |       Payload data ...    |
//! +------------------------------+---------------------------+
//! ```
//!
//! Client-to-server frames are always masked with a fresh random key.
//! Fragmented messages are not reassembled: a continuation frame decodes
//! as its own frame and is dropped by the socket layer.

use crate::traits::FrameError;
use rand::RngCore;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default ceiling for a single frame payload
pub const DEFAULT_MAX_FRAME_LEN: u64 = 16 * 1024 * 1024;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Frame opcodes understood by the nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    /// Parse the low nibble of the first header byte
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte & 0x0F {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One decoded frame, payload already unmasked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub masked: bool,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Interpret a text frame's payload
    pub fn into_text(self) -> Result<String, FrameError> {
        String::from_utf8(self.payload).map_err(|_| FrameError::InvalidUtf8)
    }
}

/// XOR `data` in place with the 4-byte key; applying it twice restores the input
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Fresh random masking key
pub fn random_mask() -> [u8; 4] {
    let mut key = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Encode a final frame with the given opcode, masking it when a key is given
pub fn encode_frame(opcode: OpCode, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let len = payload.len();
    let mut out = Vec::with_capacity(len + 14);
    out.push(FIN_BIT | opcode.as_u8());

    let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };
    if len < LEN_16 as usize {
        out.push(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(mask_bit | LEN_16);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | LEN_64);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            let start = out.len();
            out.extend_from_slice(payload);
            apply_mask(&mut out[start..], key);
        }
        None => out.extend_from_slice(payload),
    }
    out
}

/// Encode a masked text frame (client-to-server)
pub fn encode_text_frame(payload: &str) -> Vec<u8> {
    encode_frame(OpCode::Text, payload.as_bytes(), Some(random_mask()))
}

/// Encode a masked, zero-length control frame
pub fn encode_control_frame(opcode: OpCode) -> Vec<u8> {
    encode_frame(opcode, &[], Some(random_mask()))
}

/// Read exactly one frame from `reader`
///
/// `first_byte` carries a header byte the caller already consumed while
/// peeking for data. A frame with an unknown opcode is read to its end
/// before [`FrameError::UnsupportedOpcode`] is returned, so the stream stays
/// aligned on the next frame.
pub async fn decode_frame<R>(
    reader: &mut R,
    first_byte: Option<u8>,
    max_len: u64,
) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let b0 = match first_byte {
        Some(b) => b,
        None => read_u8(reader, "header").await?,
    };
    let b1 = read_u8(reader, "header").await?;

    let fin = b0 & FIN_BIT != 0;
    let raw_opcode = b0 & 0x0F;
    let masked = b1 & MASK_BIT != 0;

    let len = match b1 & 0x7F {
        LEN_16 => {
            let mut buf = [0u8; 2];
            read_exact(reader, &mut buf, "extended length").await?;
            u16::from_be_bytes(buf) as u64
        }
        LEN_64 => {
            let mut buf = [0u8; 8];
            read_exact(reader, &mut buf, "extended length").await?;
            u64::from_be_bytes(buf)
        }
        short => short as u64,
    };

    if len > max_len {
        return Err(FrameError::TooLarge {
            declared: len,
            max: max_len,
        });
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        read_exact(reader, &mut key, "mask").await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len as usize];
    read_exact(reader, &mut payload, "payload").await?;
    if let Some(key) = mask {
        apply_mask(&mut payload, key);
    }

    let opcode = OpCode::from_u8(raw_opcode).ok_or(FrameError::UnsupportedOpcode(raw_opcode))?;

    Ok(Frame {
        fin,
        opcode,
        masked,
        payload,
    })
}

async fn read_u8<R>(reader: &mut R, section: &'static str) -> Result<u8, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf, section).await?;
    Ok(buf[0])
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8], section: &'static str) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::Truncated { section }),
        Err(e) => Err(FrameError::Io(e.kind())),
    }
}
