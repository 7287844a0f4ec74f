#![cfg_attr(not(feature="std"), no_std)]

mod ty;
mod bitmap;

pub use ty::*;
pub use bitmap::*;

// Generated bitmap types expand `bitflags!` through this path
pub use bitflags;
