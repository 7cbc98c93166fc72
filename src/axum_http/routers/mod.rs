pub mod ping;
pub mod push;
