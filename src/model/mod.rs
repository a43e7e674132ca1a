pub mod backend;
pub mod checkpoint;
pub mod manifest;
