use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tailn::net::{download_to_path, DownloadParams};
use tailn::{open_source, TailReader, DEFAULT_BUFFER_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tailn")]
#[command(about = "Print the last lines of local or remote (host:path) files")]
struct Args {
    /// Number of lines to print
    #[arg(short = 'n', long = "lines", default_value_t = 10)]
    lines: usize,

    /// Bytes read per backward step
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    chunk_size: usize,

    /// Download URL into SOURCE before tailing it
    #[arg(long, value_name = "URL")]
    fetch: Option<String>,

    /// Timeout in seconds for --fetch (0 disables it)
    #[arg(long, default_value_t = 30)]
    fetch_timeout: u64,

    /// Log each read step to stderr
    #[arg(short, long)]
    verbose: bool,

    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tailn=debug" } else { "tailn=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let reader = match TailReader::with_buffer_size(args.chunk_size) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("tailn: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(url) = &args.fetch {
        if args.sources.len() != 1 {
            eprintln!("tailn: --fetch needs exactly one SOURCE to write to");
            return ExitCode::FAILURE;
        }
        let params = DownloadParams::new(url.as_str())
            .timeout(std::time::Duration::from_secs(args.fetch_timeout));
        if let Err(e) = download_to_path(&params, &args.sources[0]) {
            eprintln!("tailn: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let show_headers = args.sources.len() > 1;
    let mut stdout = io::stdout().lock();
    let mut failed = false;

    for (i, target) in args.sources.iter().enumerate() {
        let lines = match open_source(target, reader).and_then(|s| s.tail(args.lines)) {
            Ok(lines) => lines,
            Err(e) => {
                eprintln!("tailn: {}: {}", target, e);
                failed = true;
                continue;
            }
        };

        let written = (|| -> io::Result<()> {
            if show_headers {
                if i > 0 {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "==> {} <==", target)?;
            }
            for line in &lines {
                writeln!(stdout, "{}", line)?;
            }
            stdout.flush()
        })();

        if let Err(e) = written {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return ExitCode::SUCCESS;
            }
            eprintln!("tailn: write error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
