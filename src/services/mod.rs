pub mod parse;
pub mod probe;
pub mod repeat;
