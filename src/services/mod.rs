pub mod conflicts;
pub mod lifecycle;
pub mod locks;
pub mod overlap;
