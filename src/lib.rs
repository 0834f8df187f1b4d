pub mod app;
pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod perception;

pub use config::Settings;
pub use controller::{Controller, ControllerBuilder, PetUpdate};
pub use error::{CaptureError, PerceptionError, PetError};
