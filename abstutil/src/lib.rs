//! Small utilities shared by the signal planning crates: logging setup, a hierarchical timer that
//! can also fan work out over threads, and JSON file IO.

#[macro_use]
extern crate log;

mod io;
pub mod logger;
mod time;
mod utils;

pub use crate::io::{read_json, to_json, write_json};
pub use crate::time::{elapsed_seconds, prettyprint_time, Timer};
pub use crate::utils::{plain_list_names, prettyprint_usize};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;
