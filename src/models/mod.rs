pub mod animation;
pub mod plan;
pub mod prediction;
pub mod usage;

pub use animation::*;
pub use plan::*;
pub use prediction::*;
pub use usage::*;
