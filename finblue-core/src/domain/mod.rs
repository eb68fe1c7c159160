//! Domain types: raw daily bars and the annotated points the engine reads.

pub mod bar;
pub mod price_point;

pub use bar::Bar;
pub use price_point::PricePoint;
