use std::io;

use crate::dispatch::KernelTier;

#[derive(thiserror::Error, Debug)]
pub enum PcmError {
    #[error("invalid PCM format: {0}")]
    InvalidFormat(String),
    #[error("invalid converter configuration: {0}")]
    InvalidConfig(String),
    #[error("kernel tier {0} is not available on this host")]
    KernelUnavailable(KernelTier),
    #[error("source has {actual} channels but the format expects {expected}")]
    ChannelMismatch { expected: u16, actual: u16 },
    #[error("source runs at {actual} Hz but the format expects {expected} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PcmError>;
