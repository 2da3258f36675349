use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid dimensions: {message}")]
    InvalidDimensions { message: String },

    #[error("Crop region is empty ({width}x{height} after clamping)")]
    EmptyRegion { width: f64, height: f64 },

    #[error("Source image unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("Failed to encode {format} output: {message}")]
    Encode { format: String, message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CropError>;

impl CropError {
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        CropError::InvalidDimensions { message: message.into() }
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        CropError::SourceUnavailable { message: message.into() }
    }

    /// Returns true if retrying the same operation can succeed.
    ///
    /// Engine errors are deterministic given their inputs, so only
    /// filesystem failures qualify.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CropError::Io { .. })
    }

    /// Returns a user-friendly error message with recovery suggestions
    pub fn user_message(&self) -> String {
        let base_message = self.to_string();
        let suggestion = match self {
            CropError::InvalidDimensions { .. } => "The image or viewport has no usable size.",
            CropError::EmptyRegion { .. } => "Reset the crop area and select a larger region.",
            CropError::SourceUnavailable { .. } => {
                "The image could not be read. Try selecting another file."
            }
            CropError::Encode { .. } => "Try a different output format or a smaller output size.",
            CropError::Io { .. } => "File system error occurred. Check disk space and permissions.",
            CropError::Json { .. } => {
                "The settings file is malformed. Delete it to restore defaults."
            }
        };

        format!("{}\n\n{}", base_message, suggestion)
    }

    /// Returns an error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CropError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            CropError::EmptyRegion { .. } => "EMPTY_REGION",
            CropError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            CropError::Encode { .. } => "ENCODE_ERROR",
            CropError::Io { .. } => "IO_ERROR",
            CropError::Json { .. } => "JSON_ERROR",
        }
    }
}
