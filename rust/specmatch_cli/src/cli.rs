use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every query spectrum against a spectral library.
    Score(ScoreArgs),
    /// Write template configuration and spectra files.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SerializationFormat {
    Json,
    #[default]
    PrettyJson,
    Ndjson,
}

#[derive(Parser, Debug, Clone)]
pub struct ScoreArgs {
    /// The path to the json file with the query spectra.
    #[arg(short, long)]
    pub queries: PathBuf,

    /// The path to the json file with the library spectra.
    #[arg(short, long)]
    pub library: PathBuf,

    /// The path to the json file with the similarity parameters,
    /// defaults are used if not given.
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// The path to the output files.
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// The format to use for the output
    #[arg(short, long, default_value_t, value_enum)]
    pub format: SerializationFormat,

    /// Keep only the best N library hits per query (all if not given)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the output files.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
