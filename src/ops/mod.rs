pub mod adjustments;
pub mod filters;

pub use adjustments::{ColorFilter, ContrastFilter, Filter, FilterKind};
pub use filters::{PixelFilter, replay};
