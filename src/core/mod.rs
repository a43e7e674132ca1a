pub mod audio;
pub mod chunker;
pub mod dsp;
pub mod engine;
pub mod features;
pub mod resynth;
pub mod separator;
