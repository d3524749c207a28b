pub mod poll;
pub mod stream;
