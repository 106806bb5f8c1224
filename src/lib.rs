// vor-bench - Library root

pub mod bench;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
