use clap::{Parser, Subcommand};
use etagverify::utils::format_duration;
use etagverify::{
    compute_etag, verify, RemoteObject, StaticSource, VerifyOptions, DEFAULT_PART_SIZE,
    DEFAULT_STREAM_BLOCK_SIZE,
};
use log::{error, info};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line interface for etagverify
#[derive(Parser, Debug)]
#[command(
    name = "etagverify",
    version,
    about = "Validate integrity of a downloaded S3 object file",
    long_about = "Verify integrity of a downloaded S3 object by generating an ETag and comparing\n\
                  it to the value reported by the S3 API.\n\n\
                  For further reading on ETags, see \"Using part-level checksums for multipart uploads\":\n    \
                  https://docs.aws.amazon.com/AmazonS3/latest/userguide/checking-object-integrity.html"
)]
struct Cli {
    /// Number of hashing workers to use (global)
    #[arg(short, long, value_name = "WORKERS", global = true, default_value_t = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1))]
    workers: usize,

    /// Disables the progress bar (global)
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify a local file against the ETag of the remote object
    Verify {
        /// ETag reported by the storage API, e.g. 1d066c8a194f8f00b833ecc50d699cd9-996
        #[arg(short, long)]
        etag: String,
        /// Object size in bytes reported by the storage API
        #[arg(short = 's', long)]
        object_size: u64,
        /// Size in bytes of part 1 of a multipart upload (inferred when omitted)
        #[arg(short, long)]
        part_size: Option<u64>,
        /// Read size for single-part objects
        #[arg(long, default_value_t = DEFAULT_STREAM_BLOCK_SIZE)]
        stream_block_size: usize,
        /// Downloaded S3 object file
        input_file: PathBuf,
    },
    /// Compute the ETag a file would get when uploaded in parts
    Compute {
        /// Upload part size in bytes
        #[arg(short, long, default_value_t = DEFAULT_PART_SIZE)]
        part_size: u64,
        input_file: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize logging using env_logger and ETAGVERIFY_LOG
    env_logger::Builder::from_env(env_logger::Env::new().filter("ETAGVERIFY_LOG")).init();

    let cli = Cli::parse();
    let mut options = VerifyOptions {
        workers: cli.workers,
        no_progress: cli.no_progress,
        ..VerifyOptions::default()
    };

    match cli.command {
        Commands::Verify {
            etag,
            object_size,
            part_size,
            stream_block_size,
            input_file,
        } => {
            options.stream_block_size = stream_block_size;
            let mut remote = RemoteObject::new(etag, object_size);
            remote.part_size = part_size;
            let source = StaticSource::new(remote);

            info!("Using worker count: {}", options.workers);
            match verify(&source, &input_file, &options) {
                Ok(v) => {
                    println!("AWS ETag        > {}", v.remote);
                    println!("Calculated ETag > {}", v.computed);
                    println!("Verification duration: {}", format_duration(v.elapsed));
                    println!("\nFile integrity: {}", v.outcome());
                    if !v.is_valid && v.part_size_inferred {
                        eprintln!(
                            "No common part size reproduces the ETag; pass --part-size if the upload used an unusual one"
                        );
                    }
                    if v.is_valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(1)
                    }
                }
                Err(e) => {
                    error!("Failed to verify integrity of file: {}", e);
                    eprintln!("Verification failed: {}", e);
                    ExitCode::from(2)
                }
            }
        }
        Commands::Compute {
            part_size,
            input_file,
        } => match compute_etag(&input_file, part_size, &options) {
            Ok(etag) => {
                println!("{}", etag);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to compute ETag: {}", e);
                ExitCode::from(2)
            }
        },
    }
}
