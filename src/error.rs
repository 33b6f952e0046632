use thiserror::Error;

/// Argument-level failure produced by the validators in [`crate::validate`].
///
/// The display texts are the exact lines shown to the operator, so keep them
/// short and stable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bad address")]
    BadAddress,
    #[error("bad count value")]
    BadCount,
    #[error("bad boolean value")]
    BadBoolean,
    #[error("bad register value")]
    BadRegisterValue,
    #[error("bad float value")]
    BadFloatValue,
    #[error("bad delay time")]
    BadDelay,
}

#[derive(Error, Debug)]
pub enum MbconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the device/transport while servicing a read or
    /// write. Non-fatal by default; see `EngineOptions::halt_on_transport_error`.
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A register or bit access outside the configured memory area.
    #[error("address out of range: {addr}+{len}")]
    AddressRange { addr: u32, len: u32 },

    #[error("memory image: {0}")]
    Image(String),
}
