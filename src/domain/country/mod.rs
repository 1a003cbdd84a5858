pub mod directory;
pub mod model;

pub use directory::*;
pub use model::*;
