use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The screen-capture collaborator failed to produce a frame.
    #[error("capture failed: {0}")]
    Capture(String),
    /// PNG encoding or contour finding failed on a frame.
    #[error("encode failed: {0}")]
    Encode(String),
    #[error(transparent)]
    Channel(#[from] rdp_session::ChannelError),
}

impl From<image::ImageError> for CaptureError {
    fn from(e: image::ImageError) -> Self {
        Self::Encode(e.to_string())
    }
}
