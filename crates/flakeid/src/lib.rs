#![doc = include_str!("../README.md")]

mod error;
#[cfg(feature = "futures")]
mod futures;
mod generator;
mod id;
#[cfg(feature = "async-tokio")]
mod service;
mod time;

pub use crate::error::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::generator::*;
pub use crate::id::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use crate::service::*;
pub use crate::time::*;
