use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use dotenv::dotenv;
use log::{debug, error, info};
use tokio::fs;

use palettecraft::chunk::PaletteEncoding;
use palettecraft::config::Config;
use palettecraft::report::summarize;
use palettecraft::{GlobalBlockPalette, PaletteKind, PalettedBlockStorage, Result, StorageError};

const USAGE: &str = "usage: palettecraft <section file> [--to network|persisted] [--out <path>]";

#[derive(Debug, PartialEq)]
struct Args {
    input: PathBuf,
    convert: Option<PaletteKind>,
    output: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> std::result::Result<Args, String> {
    let mut input = None;
    let mut convert = None;
    let mut output = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--to" => {
                convert = Some(match args.next().as_deref() {
                    Some("network") => PaletteKind::Runtime,
                    Some("persisted") => PaletteKind::Persisted,
                    other => return Err(format!("unknown target form {other:?}")),
                })
            }
            "--out" => {
                output = Some(args.next().ok_or("--out needs a path")?.into());
            }
            _ if input.is_none() => input = Some(arg.into()),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }
    Ok(Args {
        input: input.ok_or("missing section file")?,
        convert,
        output,
    })
}

async fn run(args: Args, config: Config) -> Result<()> {
    let registry = GlobalBlockPalette::load(&config.registry_path).await?;

    let bytes = fs::read(&args.input).await?;
    let (kind, storage) = PalettedBlockStorage::read(&mut bytes.as_slice(), &registry).await?;
    info!(
        "Read {:?} section from {} ({} bytes)",
        kind,
        args.input.display(),
        bytes.len()
    );
    if config.log_sections {
        debug!("Codes: {:?}", storage.codes().collect::<Vec<_>>());
    }

    let summary = summarize(&storage, kind, &registry);
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| StorageError::Any(format!("JSON error: {e}")))?;
    println!("{json}");

    if let Some(target) = args.convert {
        let output = args
            .output
            .unwrap_or_else(|| args.input.with_extension("out"));
        let encoding = match target {
            PaletteKind::Runtime => PaletteEncoding::Runtime,
            PaletteKind::Persisted => PaletteEncoding::Persisted(&registry),
        };
        let mut buf: Vec<u8> = Vec::new();
        storage.write_with(&mut buf, encoding).await?;
        fs::write(&output, &buf).await?;
        info!("Wrote {:?} section to {}", target, output.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args, Config::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
