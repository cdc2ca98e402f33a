//! Error module for the pixels library.
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum PixelsError {
    /// A required data or metadata directory does not exist.
    DirectoryNotFound(PathBuf),
    /// The number of detected LED onsets differs from the number of trials in the metadata.
    TrialCountMismatch {
        session: String,
        onsets: usize,
        trials: usize,
    },
    /// The cue durations of the recorded data disagree with the metadata.
    TrialDataMismatch(String),
    /// A channel is missing from the behavioural data.
    MissingChannel(String),
    /// A session has no training metadata.
    MissingMetadata(String),
    /// Training metadata could not be interpreted.
    InvalidMetadata(String),
    /// No command is configured for a processing stage.
    MissingTool(String),
    /// An external tool ran but did not succeed.
    ToolFailure(String),
    /// Error for invalid parameters.
    InvalidParameter(String),
    /// Tables cannot be combined, e.g., different column levels.
    IncompatibleTables(String),
    /// Unknown action label or event name.
    InvalidLabel(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for PixelsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PixelsError::DirectoryNotFound(path) => {
                write!(f, "Directory not found: {}", path.display())
            }
            PixelsError::TrialCountMismatch {
                session,
                onsets,
                trials,
            } => write!(
                f,
                "{}: Mantis and Raspberry Pi behavioural data have different no. of trials ({} LED onsets, {} trials)",
                session, onsets, trials
            ),
            PixelsError::TrialDataMismatch(session) => write!(
                f,
                "{}: Mantis and Raspberry Pi behavioural data have mismatching trial data",
                session
            ),
            PixelsError::MissingChannel(e) => write!(f, "Missing channel: {}", e),
            PixelsError::MissingMetadata(e) => write!(f, "Missing metadata: {}", e),
            PixelsError::InvalidMetadata(e) => write!(f, "Invalid metadata: {}", e),
            PixelsError::MissingTool(e) => write!(f, "No tool configured: {}", e),
            PixelsError::ToolFailure(e) => write!(f, "Tool failure: {}", e),
            PixelsError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            PixelsError::IncompatibleTables(e) => write!(f, "Incompatible tables: {}", e),
            PixelsError::InvalidLabel(e) => write!(f, "Invalid label: {}", e),
            PixelsError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for PixelsError {}

impl From<std::io::Error> for PixelsError {
    fn from(e: std::io::Error) -> Self {
        PixelsError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for PixelsError {
    fn from(e: serde_json::Error) -> Self {
        PixelsError::InvalidMetadata(e.to_string())
    }
}

impl From<csv::Error> for PixelsError {
    fn from(e: csv::Error) -> Self {
        PixelsError::IOError(e.to_string())
    }
}
