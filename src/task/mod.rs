pub mod exec;
pub mod port;
pub mod signal;
pub mod timer;
