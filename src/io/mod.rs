pub mod crypto;
pub mod progress;
