//! Pool module - parallel sampling workers.

mod worker;

pub use worker::*;
