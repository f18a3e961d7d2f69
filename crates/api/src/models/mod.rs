pub mod layer;
pub mod unit;

pub use layer::*;
pub use unit::*;
