//! CLI argument definitions using clap
//!
//! Commands:
//! - treestore ls <file> [path] [-r] [--full-names]
//! - treestore tree <file> [path] [--attrs]
//! - treestore cat <file> <path> [--attrs POLICY]
//! - treestore info <file> <path>
//! - treestore rm <file> <path> [--attr NAME]
//! - treestore mv <file> <from> <to>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// treestore - inspect and edit tree container files
#[derive(Parser, Debug)]
#[command(name = "treestore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the children of a container
    Ls {
        /// Container file
        file: PathBuf,
        /// Container address
        #[arg(default_value = "/")]
        path: String,
        /// Descend into nested containers
        #[arg(short, long)]
        recursive: bool,
        /// Print absolute addresses
        #[arg(long)]
        full_names: bool,
    },

    /// Print the tree below an address
    Tree {
        file: PathBuf,
        #[arg(default_value = "/")]
        path: String,
        /// Include attributes
        #[arg(long)]
        attrs: bool,
    },

    /// Print a stored value as JSON
    Cat {
        file: PathBuf,
        path: String,
        /// Attribute policy: all, none, a,b or -a,-b (defaults to the config)
        #[arg(long)]
        attrs: Option<String>,
    },

    /// Print storage details of a node as JSON
    Info { file: PathBuf, path: String },

    /// Delete a node, or one attribute of it
    Rm {
        file: PathBuf,
        path: String,
        /// Delete this attribute instead of the node
        #[arg(long)]
        attr: Option<String>,
    },

    /// Move a node
    Mv {
        file: PathBuf,
        from: String,
        to: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ls_defaults() {
        let cli = Cli::try_parse_from(["treestore", "ls", "data.tstr"]).unwrap();
        match cli.command {
            Command::Ls {
                path,
                recursive,
                full_names,
                ..
            } => {
                assert_eq!(path, "/");
                assert!(!recursive);
                assert!(!full_names);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "treestore", "rm", "d.tstr", "/a", "--attr", "units", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Command::Rm { attr: Some(ref a), .. } if a == "units"));
    }
}
