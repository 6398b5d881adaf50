pub mod measurement;
pub mod target;
