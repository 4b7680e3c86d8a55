/// Errors from fetching pages and images.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("failed to read response from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode image from {url}: {source}")]
    Image {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("fetch worker panicked")]
    WorkerPanicked,
}

/// Errors from the preference store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from submitting edited coordinates.
///
/// The stub submitter never fails; `Rejected` is for a submitter that
/// actually talks to the data source.
#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
pub enum SubmitError {
    #[error("submit rejected: {0}")]
    Rejected(String),
}

/// Errors from loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from exporting a record to a local file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}
