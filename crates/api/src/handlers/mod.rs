pub mod generation;
pub mod stream;
