//! Fault taxonomy. Every variant ends in a restart; none is retried in place.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFault {
    /// Could not join the network, resolve the host, or talk to it.
    Connect,
    /// Server answered with a non-2xx status.
    Status(u16),
    /// Response did not look like HTTP.
    Malformed,
    /// Response did not fit the receive buffer.
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFault {
    NotUtf8,
    /// Body did not have exactly eight lines.
    LineCount(usize),
    LineTooLong { line: usize },
    /// Expected digits at a fixed offset of this line.
    NotANumber { line: usize },
    LevelOutOfRange(u8),
    HourOutOfRange(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Network(NetworkFault),
    Parse(ParseFault),
    /// A required setting is missing or unusable. Detected at first fetch.
    Configuration(&'static str),
}

impl Fault {
    /// Short text shown full-screen before the restart.
    pub fn message(&self) -> &'static str {
        match self {
            Fault::Network(NetworkFault::Connect) => "Wi-Fi error",
            Fault::Network(_) => "SERVER err",
            Fault::Parse(_) => "VALUE err",
            Fault::Configuration(_) => "CONFIG err",
        }
    }
}

impl From<NetworkFault> for Fault {
    fn from(fault: NetworkFault) -> Self {
        Fault::Network(fault)
    }
}

impl From<ParseFault> for Fault {
    fn from(fault: ParseFault) -> Self {
        Fault::Parse(fault)
    }
}

impl fmt::Display for NetworkFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFault::Connect => write!(f, "connection failed"),
            NetworkFault::Status(code) => write!(f, "request status: {}", code),
            NetworkFault::Malformed => write!(f, "malformed HTTP response"),
            NetworkFault::TooLarge => write!(f, "response too large"),
        }
    }
}

impl fmt::Display for ParseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFault::NotUtf8 => write!(f, "body is not UTF-8"),
            ParseFault::LineCount(n) => write!(f, "expected 8 lines, got {}", n),
            ParseFault::LineTooLong { line } => write!(f, "line {} too long", line),
            ParseFault::NotANumber { line } => {
                write!(f, "line {} is not integer, perhaps server error", line)
            }
            ParseFault::LevelOutOfRange(level) => write!(f, "risk level {} out of range", level),
            ParseFault::HourOutOfRange(hour) => write!(f, "hour {} out of range", hour),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Network(e) => write!(f, "network fault: {}", e),
            Fault::Parse(e) => write!(f, "parse fault: {}", e),
            Fault::Configuration(what) => write!(f, "configuration fault: {}", what),
        }
    }
}
