//! Record serialization for spill files.

/// Converts records to and from the payload bytes of a spill frame.
pub trait RecordCodec<R> {
    /// Append the encoding of `record` to `out`.
    fn encode(&self, record: &R, out: &mut Vec<u8>);

    /// Decode a record from exactly `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<R, CodecError>;
}

/// Raw byte records, stored as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl RecordCodec<Vec<u8>> for BytesCodec {
    fn encode(&self, record: &Vec<u8>, out: &mut Vec<u8>) {
        out.extend_from_slice(record);
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl RecordCodec<String> for Utf8Codec {
    fn encode(&self, record: &String, out: &mut Vec<u8>) {
        out.extend_from_slice(record.as_bytes());
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Fixed-width little-endian integer records.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

macro_rules! int_codec {
    ($($ty:ty),*) => {
        $(
            impl RecordCodec<$ty> for IntCodec {
                fn encode(&self, record: &$ty, out: &mut Vec<u8>) {
                    out.extend_from_slice(&record.to_le_bytes());
                }

                fn decode(&self, bytes: &[u8]) -> Result<$ty, CodecError> {
                    let array = bytes.try_into().map_err(|_| CodecError::WrongLength {
                        expected: size_of::<$ty>(),
                        actual: bytes.len(),
                    })?;
                    Ok(<$ty>::from_le_bytes(array))
                }
            }
        )*
    };
}

int_codec!(u32, u64, i32, i64);

/// Error returned when a payload cannot be decoded into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload has the wrong size for a fixed-width record.
    WrongLength { expected: usize, actual: usize },
    /// Payload is not valid UTF-8.
    InvalidUtf8,
    /// Codec-specific failure.
    Invalid(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongLength { expected, actual } => {
                write!(f, "record payload is {actual} bytes, expected {expected}")
            }
            Self::InvalidUtf8 => write!(f, "record payload is not valid UTF-8"),
            Self::Invalid(message) => write!(f, "invalid record payload: {message}"),
        }
    }
}

impl std::error::Error for CodecError {}
