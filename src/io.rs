pub mod progress;
pub mod writer;
