//! Close reason codes communicated to the remote peer and to endpoint
//! close-callbacks.

use std::fmt;

/// Enumerated close cause carried on close control frames.
///
/// The numeric values are the standard WebSocket close codes, so a reason
/// survives the wire unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// Clean close requested by either side (1000).
    Normal,
    /// Remote protocol violation or application-rejected payload (1003).
    UnsupportedData,
    /// Server-initiated abort carrying an error (1011).
    InternalError,
    /// Forced teardown of a still-open session, e.g. shutdown past its
    /// deadline (1006).
    AbnormalClosure,
}

impl CloseReason {
    /// The WebSocket close code for this reason.
    pub fn code(self) -> u16 {
        match self {
            CloseReason::Normal => 1000,
            CloseReason::UnsupportedData => 1003,
            CloseReason::InternalError => 1011,
            CloseReason::AbnormalClosure => 1006,
        }
    }

    /// Map a wire close code back to a reason. Unknown codes collapse to
    /// [`CloseReason::AbnormalClosure`].
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => CloseReason::Normal,
            1003 => CloseReason::UnsupportedData,
            1011 => CloseReason::InternalError,
            _ => CloseReason::AbnormalClosure,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloseReason::Normal => "normal-closure",
            CloseReason::UnsupportedData => "unsupported-data",
            CloseReason::InternalError => "internal-server-error",
            CloseReason::AbnormalClosure => "abnormal-closure",
        };
        write!(f, "{name}")
    }
}
