pub mod bucket;
pub mod config;
pub mod filter;
pub mod grid;
pub mod mask;
pub mod sorted;

pub use bucket::*;
pub use config::*;
pub use filter::*;
pub use grid::*;
pub use mask::*;
pub use sorted::*;
