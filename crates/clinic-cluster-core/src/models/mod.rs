//! Domain models for the clinic clustering engine.

mod assignment;
mod consultation;
mod patient;

pub use assignment::*;
pub use consultation::*;
pub use patient::*;
