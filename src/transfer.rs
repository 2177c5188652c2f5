//! Transfer modes: how payloads are laid out on the wire.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Payload layout used by a collective round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMode {
    /// Fixed-layout buffers of [`Datatype`](crate::Datatype) elements, moved in place
    Typed,
    /// Arbitrary `serde` values, encoded with `bincode`
    Generic,
}

impl FromStr for TransferMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typed" | "buffer" => Ok(TransferMode::Typed),
            "generic" | "object" => Ok(TransferMode::Generic),
            _ => Err(Error::InvalidTransferMode(s.to_string())),
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Typed => f.write_str("typed"),
            TransferMode::Generic => f.write_str("generic"),
        }
    }
}

/// Encode a value for a generic transfer.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(
        value,
        bincode::config::standard(),
    )?)
}

/// Decode a generic payload received from `source`.
pub(crate) fn decode<T: DeserializeOwned>(source: usize, bytes: &[u8]) -> Result<T> {
    let (value, read) =
        bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())?;
    if read != bytes.len() {
        return Err(Error::MalformedPayload {
            peer: source,
            reason: format!("{} trailing bytes", bytes.len() - read),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn parse_modes() {
        assert_eq!("typed".parse::<TransferMode>().unwrap(), TransferMode::Typed);
        assert_eq!("Buffer".parse::<TransferMode>().unwrap(), TransferMode::Typed);
        assert_eq!(
            " object ".parse::<TransferMode>().unwrap(),
            TransferMode::Generic
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "UPPERCASE".parse::<TransferMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidTransferMode(ref s) if s == "UPPERCASE"));
    }

    #[test]
    fn generic_payload_carries_status() {
        let bytes = encode(&Status::Done).unwrap();
        assert_eq!(decode::<Status>(1, &bytes).unwrap(), Status::Done);
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut bytes = encode(&7u32).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode::<u32>(3, &bytes),
            Err(Error::MalformedPayload { peer: 3, .. })
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode::<Status>(1, &[0xff]), Err(Error::Decode(_))));
    }
}
