use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fashionlens")]
#[command(author, version, about = "Fashion product photo classifier")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web server with the upload form and JSON API
    Serve(ServeArgs),

    /// Classify image files and print one label per image
    Classify {
        /// Classifier configuration file
        #[arg(long, default_value = "./classifiers.yaml")]
        classifiers: PathBuf,

        /// Print the full result as JSON instead of the label
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,

        /// Images to classify
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Server configuration file path
    #[arg(short, long, default_value = "server.yaml")]
    pub config: PathBuf,

    /// Classifier configuration file (overrides the server config)
    #[arg(long)]
    pub classifiers: Option<PathBuf>,

    /// Directory for uploaded images (overrides the server config)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "127.0.0.1")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "5000")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
