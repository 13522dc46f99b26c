pub mod local;
pub mod name;
pub mod provider;

pub use local::*;
pub use name::*;
pub use provider::*;
