#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
mod client;
#[cfg(feature = "std")]
pub use client::*;

pub mod protocol;
