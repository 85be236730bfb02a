use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Integer does not fit into 29 bits: {0:#x}")]
    IntegerOutOfRange(u32),

    #[error("String too long: {0} bytes")]
    StringTooLong(usize),

    #[error("Array too long: {0} elements")]
    ArrayTooLong(usize),

    #[error("Byte array too long: {0} bytes")]
    ByteArrayTooLong(usize),

    #[error("URI too long for a 16-bit length prefix: {0} bytes")]
    UriTooLong(usize),

    #[error("Too many message bodies: {0}")]
    TooManyBodies(usize),

    #[error("Message body too large: {0} bytes")]
    BodyTooLarge(usize),

    #[error("Reference to a container that was not written: {0}")]
    BadReference(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of input")]
    UnexpectedEnd,

    #[error("Unknown AMF3 type: {0}")]
    UnknownType(u8),

    #[error("Reference out of bounds: {0}")]
    BadReference(usize),

    #[error("Unknown AMF0 header type: {0}")]
    UnknownHeaderType(u8),

    #[error("Invalid UTF-8 string")]
    InvalidUtf8,

    #[error("Values nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
