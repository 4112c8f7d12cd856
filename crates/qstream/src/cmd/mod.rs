use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod frames;
pub mod request;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a captured response body into typed events.
    Decode(DecodeArgs),
    /// List the frames of a captured response body without classifying them.
    Frames(FramesArgs),
    /// Write a single well-formed event frame.
    Encode(EncodeArgs),
    /// Print the JSON request body for a single-turn conversation.
    Request(RequestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Frames(args) => frames::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Request(args) => request::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured response body (`-` for stdin).
    pub input: PathBuf,
    /// Bytes handed to the decoder per read, to mimic transport chunking.
    #[arg(long, default_value = "8192", value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,
    /// Verify prelude and message checksums.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct FramesArgs {
    /// Captured response body (`-` for stdin).
    pub input: PathBuf,
    /// Verify prelude and message checksums.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Value of the `:event-type` header.
    #[arg(long)]
    pub event_type: String,
    /// JSON payload.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Value of the `:message-type` header.
    #[arg(long, default_value = "event")]
    pub message_type: String,
    /// Append the frame to this file instead of writing it to stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// User message text.
    #[arg(long)]
    pub content: String,
    /// Continue an existing conversation.
    #[arg(long)]
    pub conversation_id: Option<String>,
    /// Pretty-print the JSON body.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open a file argument, treating `-` as stdin.
pub(crate) fn open_input(path: &Path) -> CliResult<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    File::open(path)
        .map(|file| Box::new(file) as Box<dyn Read>)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))
}
