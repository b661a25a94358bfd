use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Trading platforms that can attach to the bridge
///
/// Travels on the wire as its integer ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum TradingPlatform {
    /// Identity not yet revealed by a handshake
    #[default]
    Unknown = 0,
    MetaTrader4 = 1,
    MetaTrader5 = 2,
    NinjaTrader = 3,
    /// The bridge server itself
    TradingBridge = 4,
}

impl TradingPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::MetaTrader4 => "MetaTrader4",
            Self::MetaTrader5 => "MetaTrader5",
            Self::NinjaTrader => "NinjaTrader",
            Self::TradingBridge => "TradingBridge",
        }
    }

    /// Returns true once the platform has been identified
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl TryFrom<u8> for TradingPlatform {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::MetaTrader4),
            2 => Ok(Self::MetaTrader5),
            3 => Ok(Self::NinjaTrader),
            4 => Ok(Self::TradingBridge),
            other => Err(CodecError::UnknownPlatform(other)),
        }
    }
}

impl From<TradingPlatform> for u8 {
    fn from(value: TradingPlatform) -> Self {
        value as u8
    }
}

impl std::fmt::Display for TradingPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
