//! Tools for MRC image stacks: section-wise comparison of two files and
//! in-plane linear rescaling of a stack.

pub mod compare;
pub mod error;
pub mod logging;
pub mod mode;
pub mod read;
pub mod render;
pub mod resample;
pub mod stats;
pub mod write;

pub use error::{Error, Result};
pub use mode::Mode;
pub use read::{ReadMode, Volume};
