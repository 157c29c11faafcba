//! Value codecs for persisted state.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Turns values into the string form a [`KeyValueStore`](super::KeyValueStore) holds.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(value: &T) -> Result<String, CodecError>;
    fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError>;
}

/// Plain JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// MessagePack (named fields), stored as base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
        let bytes = rmp_serde::to_vec_named(value)?;
        Ok(STANDARD.encode(bytes))
    }

    fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
        let bytes = STANDARD.decode(raw.trim())?;
        Ok(rmp_serde::from_slice(&bytes)?)
    }
}
