//! Wire encodings for frames and instance state.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, ServerError};

/// How messages and state blobs are encoded on the wire.
///
/// Both ends of a connection must agree; the server uses one format for
/// every client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// MessagePack with named fields, what AR clients speak.
    #[default]
    MsgPack,
    /// Compact binary for Rust peers.
    Bincode,
    /// JSON text carried in binary frames. Handy for debugging clients.
    Json,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::MsgPack => "msgpack",
            WireFormat::Bincode => "bincode",
            WireFormat::Json => "json",
        }
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            WireFormat::MsgPack => {
                rmp_serde::to_vec_named(value).map_err(|e| ServerError::codec(*self, e))
            }
            WireFormat::Bincode => {
                bincode::serialize(value).map_err(|e| ServerError::codec(*self, e))
            }
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| ServerError::codec(*self, e))
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            WireFormat::MsgPack => {
                rmp_serde::from_slice(bytes).map_err(|e| ServerError::codec(*self, e))
            }
            WireFormat::Bincode => {
                bincode::deserialize(bytes).map_err(|e| ServerError::codec(*self, e))
            }
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| ServerError::codec(*self, e))
            }
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" => Ok(WireFormat::MsgPack),
            "bincode" => Ok(WireFormat::Bincode),
            "json" => Ok(WireFormat::Json),
            other => Err(ServerError::Config(format!(
                "unknown wire format {:?} (expected msgpack, bincode or json)",
                other
            ))),
        }
    }
}
