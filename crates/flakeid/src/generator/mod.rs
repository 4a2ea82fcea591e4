mod atomic;
mod basic;
mod config;
mod interface;
mod lock;
mod mutex;
mod status;
#[cfg(test)]
mod tests;
mod wait;

pub use atomic::*;
pub use basic::*;
pub use config::*;
pub use interface::*;
pub use lock::*;
pub(crate) use mutex::*;
pub use status::*;
pub use wait::*;
