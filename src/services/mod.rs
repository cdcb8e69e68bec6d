pub mod controller;
pub mod poller;
pub mod recorder;

pub use controller::{Controller, StartOutcome};
pub use poller::{LoopSettings, Services};
pub use recorder::CpalRecorder;

#[cfg(test)]
pub(crate) mod testing;
