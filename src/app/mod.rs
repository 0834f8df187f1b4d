pub mod pet_window;
pub mod presentation;

pub use pet_window::PetApp;
pub use presentation::PresentationState;
