use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this crate can potentially
/// return.
///
/// # Error Categories
///
/// ## Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid module/key structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond buffer boundaries
/// - [`Error::NotSupported`] - Not a recognized module image at all
/// - [`Error::Empty`] - Empty input provided
///
/// ## Resolution and I/O Errors
/// - [`Error::ModuleNotFound`] - A named target module could not be resolved
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// The distinction between [`Error::NotSupported`] and the other load errors matters
/// during closure discovery: files that are simply not modules are expected noise and
/// skipped silently, while anything else is reported before being skipped.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file is not a recognized module image.
    ///
    /// Expected, non-fatal noise during directory scanning: plenty of files share
    /// the module extensions without being modules.
    #[error("This file is not a recognized module image")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// A target module name could not be resolved against the search directories.
    #[error("Could not resolve module '{0}' in any search directory")]
    ModuleNotFound(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
