//! Command-line interface for treestore container files
//!
//! Provides:
//! - ls: List the children of a container
//! - tree: Print the box-drawing tree below an address
//! - cat: Read a value and print it as JSON
//! - info: Print the storage type, dims and compression of a node
//! - rm: Delete a node or an attribute
//! - mv: Move a node

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{cat, info, load_config, ls, mv, rm, run, run_command, tree};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{info_json, value_json, write_json, write_lines};
