use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// EisenScript program
    pub input: PathBuf,
    /// Write the JSON-lines scene here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Replace the program's `set seed`
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,
    /// Upper bound on drawn objects; the smaller of this and `set maxobjects` wins
    #[arg(long)]
    pub max_objects: Option<u64>,
    /// Parse and validate only
    #[arg(long)]
    pub check: bool,
}
