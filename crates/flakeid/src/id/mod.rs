mod decoded;
mod flake;

pub use decoded::*;
pub use flake::*;
