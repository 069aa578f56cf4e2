use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagecraft")]
#[command(about = "Merge, split and reorganize PDF pages, with MCP server support")]
#[command(version)]
pub struct Cli {
    /// JSON config file (output names, archive compression)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server
    Mcp,

    /// Display page count and metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Combine PDFs into one, optionally taking only some pages of each
    Merge {
        /// Inputs as PATH or PATH:RANGES (e.g. "a.pdf:1-3,5").
        /// Directories contribute every PDF inside them, sorted by name.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a PDF into several documents
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        #[command(flatten)]
        mode: SplitMode,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Write a single zip archive instead of separate files
        #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
        zip: Option<String>,
    },

    /// Reorder, rotate and delete pages
    Organize {
        /// PDF file to organize
        path: PathBuf,

        /// New page order; omitted pages are deleted.
        /// Suffix R, D or L rotates 90, 180 or 270 degrees (e.g. "3R,1,2D,5-end")
        order: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("split_mode").required(true)))]
pub struct SplitMode {
    /// One document per range (e.g. "1-3,5,8-10")
    #[arg(long, group = "split_mode")]
    pub ranges: Option<String>,

    /// Selected pages (e.g. "1,4,6-8"), in one document unless --separate
    #[arg(long, group = "split_mode")]
    pub pages: Option<String>,

    /// With --pages, one document per selected page
    #[arg(long, requires = "pages")]
    pub separate: bool,

    /// Fixed number of pages per document
    #[arg(long, group = "split_mode", value_name = "N")]
    pub every: Option<u32>,
}
