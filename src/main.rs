use std::path::{Path, PathBuf};
use std::process;

use flexi_logger::{Logger, LoggerHandle};
use log::{error, info};
use structopt::StructOpt;

use micrograph_features::error::Result;
use micrograph_features::{
    default_output_name, discover_images, save_csv, segment_file, BatchExtractor, BlockSelection,
    FeatureExtractor, Params, SizePolicy,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "micrograph-features",
    about = "Phase segmentation and texture features for micrographs"
)]
struct Opt {
    /// Log filter, overridden by RUST_LOG
    #[structopt(long, default_value = "info")]
    log_level: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Extract one feature row per image into a CSV file
    Features {
        /// Image files or directories
        #[structopt(parse(from_os_str), required = true)]
        inputs: Vec<PathBuf>,

        /// Output file, `<prefix>_<images>_<blocks>.csv` by default
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,

        #[structopt(long, default_value = "feature-collection")]
        prefix: String,

        /// JSON parameter file
        #[structopt(long, parse(from_os_str))]
        params: Option<PathBuf>,

        /// Comma separated blocks among area, spatial, haralick, lbp
        #[structopt(long, default_value = "area,spatial,haralick,lbp")]
        blocks: BlockSelection,

        /// Worker threads
        #[structopt(short = "j", long)]
        threads: Option<usize>,

        /// Extensions picked up when an input is a directory
        #[structopt(long, use_delimiter = true, default_value = "tiff,tif,png")]
        extensions: Vec<String>,

        /// Reject images of an unknown acquisition size
        #[structopt(long)]
        strict_size: bool,
    },
    /// Write the phase overlay of one image as `<stem>_segmentation.png`
    Segment {
        #[structopt(parse(from_os_str))]
        image: PathBuf,

        #[structopt(long, parse(from_os_str), default_value = ".")]
        output_dir: PathBuf,

        /// JSON parameter file
        #[structopt(long, parse(from_os_str))]
        params: Option<PathBuf>,
    },
}

fn setup_logging(base_level: &str) -> Option<LoggerHandle> {
    match Logger::try_with_env_or_str(base_level).and_then(|logger| logger.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Logger initialization failed with {}", e);
            None
        }
    }
}

fn load_params(path: Option<&Path>) -> Result<Params> {
    match path {
        Some(path) => Params::from_json_file(path),
        None => Ok(Params::default()),
    }
}

/// Explicit output, or the default name counting every image found,
/// failed ones included.
fn output_path(output: Option<PathBuf>, prefix: &str, found: usize, blocks: &BlockSelection) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(default_output_name(prefix, found, blocks)))
}

fn run(cmd: Command) -> Result<()> {
    match cmd {
        Command::Features {
            inputs,
            output,
            prefix,
            params,
            blocks,
            threads,
            extensions,
            strict_size,
        } => {
            let mut params = load_params(params.as_deref())?;
            if strict_size {
                params.size_policy = SizePolicy::Fail;
            }
            let extractor = FeatureExtractor::new(params, blocks)?;
            let paths = discover_images(&inputs, &extensions)?;

            let report = BatchExtractor::new(extractor)
                .threads(threads)
                .on_progress(|done, total| info!("[{}/{}]", done, total))
                .run(&paths)?;

            let output = output_path(output, &prefix, paths.len(), &blocks);
            save_csv(&report.matrix, &output)?;
            let (rows, cols) = report.matrix.shape();
            info!("wrote {} rows of {} features to {}", rows, cols, output.display());
            if !report.failures.is_empty() {
                error!("{} images could not be processed", report.failures.len());
            }
            Ok(())
        }
        Command::Segment {
            image,
            output_dir,
            params,
        } => {
            let params = load_params(params.as_deref())?;
            let overlay = segment_file(&image, &params)?;
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let output = output_dir.join(format!("{}_segmentation.png", stem));
            overlay.save(&output)?;
            info!("segmentation written to {}", output.display());
            Ok(())
        }
    }
}

fn main() {
    let opt = Opt::from_args();
    let _logger = setup_logging(&opt.log_level);

    if let Err(e) = run(opt.cmd) {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_counts_images_found() {
        let blocks = BlockSelection::all();
        assert_eq!(
            output_path(None, "feature-collection", 7, &blocks),
            PathBuf::from("feature-collection_7_1111.csv")
        );
        let explicit = PathBuf::from("out/table.csv");
        assert_eq!(output_path(Some(explicit.clone()), "x", 7, &blocks), explicit);
    }
}
