use anyhow::Result;
use clap::Parser;
use squeeze_pack::cli::{Args, Commands};
use squeeze_pack::commands::{build_options, run_batch, run_compress, run_pack, BatchRun};
use squeeze_pack::logger;

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match args.command {
        Commands::Compress {
            input,
            output,
            quality,
            format,
            timeout,
            json,
        } => {
            let options = build_options(quality, format.as_deref(), timeout)?;
            run_compress(&input, output, options, json)?;
        }
        Commands::Batch {
            input,
            output,
            quality,
            format,
            recursive,
            workers,
            sequential,
            zip,
            timeout,
            json,
        } => {
            let options = build_options(quality, format.as_deref(), timeout)?;
            run_batch(BatchRun {
                input,
                output,
                options,
                recursive,
                workers,
                sequential,
                zip,
                json,
            })?;
        }
        Commands::Pack { manifest, output } => {
            run_pack(&manifest, output)?;
        }
    }

    Ok(())
}
