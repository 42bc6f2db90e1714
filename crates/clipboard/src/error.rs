use std::fmt;

/// Error type for clipboard operations.
///
/// Everything here is non-fatal to the application: failures surface as a
/// result plus a logged diagnostic, never as a crash.
#[derive(Debug)]
pub enum ClipboardError {
    /// Paste attempted with neither HTML nor plain text available.
    NoClipboardData,
    /// The platform clipboard write failed.
    WriteFailed(String),
    /// The platform clipboard read failed.
    ReadFailed(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::NoClipboardData => write!(f, "no valid data on clipboard"),
            ClipboardError::WriteFailed(msg) => write!(f, "clipboard write failed: {}", msg),
            ClipboardError::ReadFailed(msg) => write!(f, "clipboard read failed: {}", msg),
        }
    }
}

impl std::error::Error for ClipboardError {}
