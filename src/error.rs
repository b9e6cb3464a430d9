use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Please select {0}.")]
    MissingInput(&'static str),

    #[error("No PSD files found at {}", .0.display())]
    NoFilesFound(PathBuf),

    #[error("{message}")]
    Decode { file: String, message: String },

    #[error("{file}: {source}")]
    Write {
        file: String,
        #[source]
        source: WriteFailure,
    },
}

/// Reasons an output could not be produced once the image was decoded.
#[derive(Error, Debug)]
pub enum WriteFailure {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

impl ExportError {
    pub fn write(file: impl Into<String>, source: impl Into<WriteFailure>) -> Self {
        ExportError::Write {
            file: file.into(),
            source: source.into(),
        }
    }

    /// Text shown in the log next to the offending file name.
    pub fn detail(&self) -> String {
        match self {
            ExportError::Write { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message() {
        let err = ExportError::MissingInput("an output folder");
        assert_eq!(err.to_string(), "Please select an output folder.");
    }

    #[test]
    fn test_write_detail_omits_file_name() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ExportError::write("a.psd", io);
        assert_eq!(err.to_string(), "a.psd: IO error: denied");
        assert_eq!(err.detail(), "IO error: denied");
    }
}
