pub mod artifacts;
pub mod entities;
pub mod messaging;
pub mod parameters;
pub mod value_objects;

pub use artifacts::*;
pub use entities::*;
pub use messaging::*;
pub use parameters::*;
pub use surge_errors::{SurgeError, SurgeResult};
pub use value_objects::*;
