use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sprig",
    about = "sprig: a content-addressed object store for snapshots",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Compute the ID of a file as a blob, optionally storing it
    HashObject(HashObjectArgs),
    /// Show an object's kind, size or content
    CatFile(CatFileArgs),
    /// List the entries of a tree
    LsTree(LsTreeArgs),
    /// Snapshot the work tree and print the tree ID
    WriteTree(WriteTreeArgs),
    /// Create a commit from an existing tree
    CommitTree(CommitTreeArgs),
    /// Snapshot the work tree and commit it
    Commit(CommitArgs),
    /// Get or set configuration
    Config(ConfigArgs),
    /// Verify every stored object and the links between them
    Fsck(FsckArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashObjectArgs {
    /// Store the blob as well as printing its ID
    #[arg(short = 'w')]
    pub write: bool,
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false, id = "mode")]
pub struct CatFileMode {
    /// Print the object's kind
    #[arg(short = 't')]
    pub kind: bool,
    /// Print the object's body size in bytes
    #[arg(short = 's')]
    pub size: bool,
    /// Pretty-print the object's content
    #[arg(short = 'p')]
    pub pretty: bool,
}

#[derive(Args)]
pub struct CatFileArgs {
    #[command(flatten)]
    pub mode: CatFileMode,
    pub object: String,
}

#[derive(Args)]
pub struct LsTreeArgs {
    pub tree: String,
}

#[derive(Args)]
pub struct WriteTreeArgs {}

#[derive(Args)]
pub struct CommitTreeArgs {
    pub tree: String,
    /// Parent commit, repeatable; order is kept
    #[arg(short = 'p', long = "parent")]
    pub parents: Vec<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Parent commit, repeatable; order is kept
    #[arg(short = 'p', long = "parent")]
    pub parents: Vec<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Args)]
pub struct FsckArgs {}
