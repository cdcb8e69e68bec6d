use thiserror::Error;

/// Problems with the selected input device, surfaced when a session is started
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no input device selected")]
    NotSelected,
    #[error("input device not found: {0}")]
    NotFound(String),
    #[error("input device has no input channels: {0}")]
    UnsupportedChannels(String),
    #[error("failed to enumerate input devices: {0}")]
    Enumeration(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device")]
    NoDevice,
    #[error("device reports no input channels")]
    UnsupportedChannels,
    #[error("capture failed: {0}")]
    CaptureFailure(String),
}
