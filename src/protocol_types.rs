pub mod primitives;
pub mod traits;
