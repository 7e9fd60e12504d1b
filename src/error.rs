//! Error types for voxnote.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxnoteError {
    // Initialization errors — engine capability could not be set up at all
    #[error("Engine initialization failed: {message}")]
    EngineInit { message: String },

    // Load errors — both the accelerated and the fallback device refused
    #[error("Model load failed for {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("Model not found in cache: {model}")]
    ModelNotCached { model: String },

    // Inference errors — a transcription pass threw
    #[error("Transcription inference failed: {message}")]
    Inference { message: String },

    // Worker transport errors — the worker task is gone or unreachable
    #[error("Transcription worker unavailable: {message}")]
    WorkerGone { message: String },

    // Configuration errors
    #[error("Cloud transcription requires an API key")]
    MissingCredential,

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Network errors (cloud path only)
    #[error("Cloud transcription failed: {message}")]
    CloudTranscription { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxnoteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn model_load_display_includes_model_and_message() {
        let error = VoxnoteError::ModelLoad {
            model: "whisper-tiny.en".to_string(),
            message: "out of memory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Model load failed for whisper-tiny.en: out of memory"
        );
    }

    #[test]
    fn missing_credential_display() {
        let error = VoxnoteError::MissingCredential;
        assert_eq!(error.to_string(), "Cloud transcription requires an API key");
    }

    #[test]
    fn inference_display() {
        let error = VoxnoteError::Inference {
            message: "invalid sample buffer".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription inference failed: invalid sample buffer"
        );
    }

    #[test]
    fn from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxnoteError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: VoxnoteError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxnoteError>();
        assert_sync::<VoxnoteError>();
    }
}
