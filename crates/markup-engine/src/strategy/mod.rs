//! Execution strategies implementing the renderer contract.
//!
//! - [`CommandStrategy`]: external executable, content on stdin
//! - [`LibraryStrategy`]: in-process converter

mod command;
mod library;
mod process;

pub use command::CommandStrategy;
pub use library::LibraryStrategy;
