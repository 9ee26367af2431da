pub mod effect;
pub mod library;
