//! `ur:bytes` transport encoding
//!
//! A payload is wrapped as a CBOR byte string and rendered as a UR in
//! minimal bytewords, which keeps QR codes in alphanumeric mode. Payloads
//! too large for one static QR are split into fountain-coded parts for an
//! animated QR; [`UrCollector`] puts them back together.

use ::ur::ur::{Error as RawUrError, Kind};
use ::ur::{Decoder, Encoder, Type};
use std::fmt;
use thiserror::Error;

const UR_BYTES_PREFIX: &str = "ur:bytes/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrError {
    #[error("Not a ur:bytes payload")]
    NotBytesUr,
    #[error("Part of an animated ur:bytes sequence")]
    MultiPart,
    #[error("UR decoding failed: {0}")]
    Ur(String),
    #[error("Malformed CBOR byte string: {0}")]
    Cbor(String),
}

impl From<RawUrError> for UrError {
    fn from(e: RawUrError) -> Self {
        UrError::Ur(e.to_string())
    }
}

/// True if `s` looks like any UR, regardless of type
pub fn is_ur(s: &str) -> bool {
    s.trim().to_lowercase().starts_with("ur:")
}

/// Encode `data` as a single-part `ur:bytes/<bytewords>`
pub fn encode_bytes(data: &[u8]) -> Result<String, UrError> {
    Ok(::ur::encode(&wrap_cbor(data)?, &Type::Bytes))
}

/// Encode `data` as `ur:bytes/<seq>-<count>/<bytewords>` parts, one per
/// fragment of at most `max_fragment_len` bytes
pub fn encode_bytes_animated(data: &[u8], max_fragment_len: usize) -> Result<Vec<String>, UrError> {
    let cbor = wrap_cbor(data)?;
    let mut encoder = Encoder::bytes(&cbor, max_fragment_len)?;
    (0..encoder.fragment_count())
        .map(|_| encoder.next_part().map_err(UrError::from))
        .collect()
}

/// Decode a single-part `ur:bytes` string back to the raw payload.
///
/// Scanners often hand back upper case; both cases are accepted.
pub fn decode_bytes(s: &str) -> Result<Vec<u8>, UrError> {
    let lowered = bytes_ur(s)?;
    match ::ur::decode(&lowered)? {
        (Kind::SinglePart, cbor) => unwrap_cbor(&cbor),
        (Kind::MultiPart, _) => Err(UrError::MultiPart),
    }
}

/// Lower-cased `s`, if it is a `ur:bytes` string
fn bytes_ur(s: &str) -> Result<String, UrError> {
    let lowered = s.trim().to_lowercase();
    if !lowered.starts_with(UR_BYTES_PREFIX) {
        return Err(UrError::NotBytesUr);
    }
    Ok(lowered)
}

fn wrap_cbor(data: &[u8]) -> Result<Vec<u8>, UrError> {
    let mut cbor = Vec::with_capacity(data.len() + 9);
    minicbor::Encoder::new(&mut cbor)
        .bytes(data)
        .map_err(|e| UrError::Cbor(e.to_string()))?;
    Ok(cbor)
}

fn unwrap_cbor(cbor: &[u8]) -> Result<Vec<u8>, UrError> {
    let mut decoder = minicbor::Decoder::new(cbor);
    let data = decoder.bytes().map_err(|e| UrError::Cbor(e.to_string()))?;
    if decoder.position() != cbor.len() {
        return Err(UrError::Cbor(format!(
            "{} trailing bytes",
            cbor.len() - decoder.position()
        )));
    }
    Ok(data.to_vec())
}

/// Reassembles payloads from scanned UR strings.
///
/// A single-part UR completes immediately. Parts of an animated sequence
/// are buffered until the fountain decoder holds the whole message, after
/// which the collector is ready for the next sequence.
#[derive(Default)]
pub struct UrCollector {
    decoder: Decoder,
    received: usize,
}

impl UrCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one scanned UR. Returns the payload once it is complete.
    pub fn receive(&mut self, part: &str) -> Result<Option<Vec<u8>>, UrError> {
        let lowered = bytes_ur(part)?;
        let (kind, cbor) = ::ur::decode(&lowered)?;
        if kind == Kind::SinglePart {
            return unwrap_cbor(&cbor).map(Some);
        }

        self.decoder.receive(&lowered)?;
        self.received += 1;
        if !self.decoder.complete() {
            log::debug!("Animated UR: {} parts received", self.received);
            return Ok(None);
        }

        let message = self.decoder.message()?;
        self.reset();
        match message {
            Some(cbor) => unwrap_cbor(&cbor).map(Some),
            None => Ok(None),
        }
    }

    /// Parts of the current animated sequence received so far
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_pending(&self) -> bool {
        self.received > 0
    }

    /// Drop a half-received sequence
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for UrCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrCollector")
            .field("received", &self.received)
            .finish()
    }
}
