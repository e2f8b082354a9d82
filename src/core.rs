//! Audio math: stem mixing, clip chaining and mastering.

pub mod chain;
pub mod dsp;
pub mod master;
pub mod mixer;
pub mod resample;
