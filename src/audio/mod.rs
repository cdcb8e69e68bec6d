pub mod capture;
pub mod clip;
pub mod devices;
pub mod error;
pub mod format;

pub use capture::AudioCapture;
pub use clip::AudioClip;
pub use devices::{CpalDevices, DeviceCatalog, DeviceId, InputDevice};
pub use error::{CaptureError, DeviceError};
pub use format::AudioFormat;
