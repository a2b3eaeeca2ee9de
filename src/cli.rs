use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "squeeze-pack",
    about = "Compress batches of images and package the results",
    long_about = "squeeze-pack compresses images to JPEG, PNG or WebP at a chosen quality, \
                  reports per-image and overall size reduction, and packages the results \
                  either as individual files or as a single ZIP archive.",
    version,
    after_help = "EXAMPLES:\n  \
    squeeze-pack compress photo.png -q 75 -f webp\n  \
    squeeze-pack batch ./images ./compressed -r -f webp --zip\n  \
    squeeze-pack batch \"./shots/*.png\" ./out --sequential --json > report.json\n  \
    squeeze-pack pack report.json -o images.zip"
)]
pub struct Args {
    #[arg(short = 'Q', long, global = true, help = "Only log warnings and errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Log per-item details")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress one image with the given quality and output format. \
                      The output format defaults to the source's own format."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(
            short = 'o',
            long,
            help = "Output file path (default: compressed-<name> next to the input)"
        )]
        output: Option<PathBuf>,

        #[arg(
            short = 'q',
            long,
            help = "Compression quality (1-100, default: 80)",
            long_help = "Compression quality from 1 (lowest) to 100 (highest). \
                         For PNG the value is mapped onto a 1-10 effort scale (quality / 10)."
        )]
        quality: Option<u8>,

        #[arg(
            short = 'f',
            long,
            help = "Output format (jpeg, png, webp, original)",
            long_help = "Output format. 'original' keeps the source format. \
                         Unrecognized formats fall back to JPEG."
        )]
        format: Option<String>,

        #[arg(long, value_name = "SECONDS", help = "Give up on the image after this many seconds")]
        timeout: Option<u64>,

        #[arg(long, help = "Print the result as JSON, including the compressed data URL")]
        json: bool,
    },

    #[command(
        about = "Compress every image in a directory or glob",
        long_about = "Collect images from a file, directory or glob pattern, compress every one \
                      of them and write the results to an output directory. A failing image \
                      never stops the rest of the batch."
    )]
    Batch {
        #[arg(
            help = "Input directory, file pattern, or glob",
            long_help = "Input can be a directory path, file pattern, or glob expression. \
                         Examples: './images', '*.jpg', '/path/to/images/*.png'"
        )]
        input: String,

        #[arg(help = "Output directory path")]
        output: PathBuf,

        #[arg(short = 'q', long, help = "Compression quality (1-100, default: 80)")]
        quality: Option<u8>,

        #[arg(short = 'f', long, help = "Output format (jpeg, png, webp, original)")]
        format: Option<String>,

        #[arg(short = 'r', long, help = "Process subdirectories recursively")]
        recursive: bool,

        #[arg(
            short = 'j',
            long,
            help = "Number of parallel workers (default: auto)",
            long_help = "Upper bound on parallel workers. The actual count is also limited \
                         by the number of images and by available memory."
        )]
        workers: Option<usize>,

        #[arg(long, help = "Compress one image at a time, in input order")]
        sequential: bool,

        #[arg(
            short = 'z',
            long,
            help = "Package results as a single ZIP",
            long_help = "Write one dated ZIP archive instead of individual files. \
                         When only one image was compressed it is written directly."
        )]
        zip: bool,

        #[arg(long, value_name = "SECONDS", help = "Give up on an image after this many seconds")]
        timeout: Option<u64>,

        #[arg(long, help = "Print a JSON report usable as a `pack` manifest")]
        json: bool,
    },

    #[command(
        about = "Build a ZIP from a JSON manifest of compressed images",
        long_about = "Read a manifest of the form {\"images\": [{\"compressedUrl\": \"data:...\"}]} \
                      (as printed by `compress --json` or `batch --json`) and package every \
                      decodable image into one ZIP. Undecodable entries are skipped and listed."
    )]
    Pack {
        #[arg(help = "Manifest JSON file")]
        manifest: PathBuf,

        #[arg(short = 'o', long, help = "Output ZIP path (default: compressed-images-<date>.zip)")]
        output: Option<PathBuf>,
    },
}
