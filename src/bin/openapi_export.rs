use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use epack_api::openapi::ApiDocV1;
use utoipa::OpenApi;

/// Writes the v1 OpenAPI document for the portal frontend.
#[derive(Parser)]
#[command(name = "openapi-export")]
struct Args {
    /// Destination file
    #[arg(short, long, default_value = "openapi/epack-api.v1.json")]
    output: PathBuf,

    /// Print to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let json = serde_json::to_string_pretty(&ApiDocV1::openapi())?;

    if args.stdout {
        println!("{json}");
        return Ok(());
    }

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&args.output, json)
        .with_context(|| format!("writing {}", args.output.display()))?;
    eprintln!("OpenAPI document written to {}", args.output.display());
    Ok(())
}
