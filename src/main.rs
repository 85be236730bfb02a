use std::{path::PathBuf, process::ExitCode};

use amfkit::{
    commands::{self, EncodeOptions},
    config::read_config,
    logger::init_logger,
};
use clap::{Parser, Subcommand};
use tracing::error;

/// Build and inspect AMF3 remoting envelopes.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode a call envelope and write it to a file.
    Encode {
        /// Remote method, e.g. `SystemLogin.checkVersion`.
        #[arg(long)]
        target: String,

        /// Call arguments as a JSON array.
        #[arg(long, default_value = "[]")]
        args: String,

        /// Response URI, defaults to AMFKIT_RESPONSE_URI or `/1`.
        #[arg(long)]
        response_uri: Option<String>,

        /// Envelope version, defaults to AMFKIT_AMF_VERSION or 3.
        #[arg(long)]
        amf_version: Option<u16>,

        #[arg(long, short)]
        out: PathBuf,
    },

    /// Decode the first body of a captured envelope and print it as JSON.
    Decode {
        path: PathBuf,

        /// Print the reply flattened into named fields.
        #[arg(long)]
        normalize: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = read_config();
    init_logger(config.logger.clone());

    let result = match args.command {
        Command::Encode {
            target,
            args,
            response_uri,
            amf_version,
            out,
        } => {
            let opts = EncodeOptions {
                target,
                response_uri: response_uri.unwrap_or(config.response_uri),
                version: amf_version.unwrap_or(config.amf_version),
                args,
            };
            commands::encode_to_file(&opts, &out)
        }
        Command::Decode { path, normalize } => {
            commands::decode_file(&path, normalize).and_then(|json| {
                println!("{}", serde_json::to_string_pretty(&json)?);
                Ok(())
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
