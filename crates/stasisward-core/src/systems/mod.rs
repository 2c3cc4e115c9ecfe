//! Systems - logic that operates on components

mod containment;
mod needs;
mod stasis;
mod suspension;

pub use containment::*;
pub use needs::*;
pub use stasis::*;
pub use suspension::*;
