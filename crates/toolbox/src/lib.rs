pub mod arguments;
mod hex;
mod run;

pub use run::{run, start};
