//! Built-in compilation passes.

mod cancel;
mod mapping;

pub use cancel::CxCancellation;
pub use mapping::{DirectionMapping, SwapExpansion, SwapMapping};
