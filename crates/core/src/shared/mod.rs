pub mod constants;
pub mod face;
pub mod image;
