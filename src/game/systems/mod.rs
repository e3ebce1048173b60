pub mod collision;
pub mod gravity;
pub mod holes;
pub mod physics;
