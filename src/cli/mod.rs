//! Command-line front end over the note context.
mod app;
mod main;

pub use app::*;
pub use main::*;
