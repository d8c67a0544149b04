//! Error types surfaced by the measurement pipeline.

use crate::fit::FitError;

/// Errors that can occur while measuring an edge.
///
/// Degenerate contrast (both side means summing to zero) is not an error:
/// it resolves to a contrast of `0.0` inside the side classifier.
#[derive(Debug)]
pub enum EdgeError {
    /// ROI diameter does not fit inside the pixel grid.
    InvalidRoi {
        /// Requested ROI diameter in pixels.
        diameter: u32,
        /// Grid width in pixels.
        width: u32,
        /// Grid height in pixels.
        height: u32,
    },
    /// Automatic detection found no line above the vote threshold.
    NoEdgeFound,
    /// Manual analysis needs exactly two points.
    InvalidManualInput {
        /// Number of points supplied by the caller.
        got: usize,
    },
    /// The two manual points coincide, so they define no line.
    CoincidentPoints,
    /// No in-disk pixel contributed to the edge spread function.
    EmptyEdgeSpreadFunction,
    /// Blur estimator failed to fit the edge model.
    Fit(FitError),
    /// Font bytes could not be parsed for the overlay annotation.
    InvalidFont,
    /// Filesystem error (batch I/O, config files).
    Io(std::io::Error),
    /// Image decode/encode error.
    Image(image::ImageError),
    /// Configuration (de)serialization error.
    Json(serde_json::Error),
}

impl EdgeError {
    /// `true` for the expected, non-fatal "no edge in this image" outcome.
    pub fn is_no_edge(&self) -> bool {
        matches!(self, Self::NoEdgeFound)
    }
}

impl std::fmt::Display for EdgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoi {
                diameter,
                width,
                height,
            } => write!(
                f,
                "invalid ROI: diameter {} exceeds grid {}x{}",
                diameter, width, height
            ),
            Self::NoEdgeFound => write!(f, "no edge found"),
            Self::InvalidManualInput { got } => {
                write!(f, "invalid manual input: expected 2 points, got {}", got)
            }
            Self::CoincidentPoints => write!(f, "invalid manual input: points coincide"),
            Self::EmptyEdgeSpreadFunction => write!(f, "edge spread function is empty"),
            Self::Fit(e) => write!(f, "edge fit failed: {}", e),
            Self::InvalidFont => write!(f, "invalid font data"),
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Image(e) => write!(f, "image error: {}", e),
            Self::Json(e) => write!(f, "config error: {}", e),
        }
    }
}

impl std::error::Error for EdgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fit(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FitError> for EdgeError {
    fn from(e: FitError) -> Self {
        Self::Fit(e)
    }
}

impl From<std::io::Error> for EdgeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for EdgeError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<serde_json::Error> for EdgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
