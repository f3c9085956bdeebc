#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use sortkit::{BytesCodec, Comparator, ExternalSorter, NaturalOrder, ReverseOrder, SorterConfig, SorterError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: sortkit [--reverse] [INPUT]

Sorts the lines of INPUT (or stdin) by byte value and writes them to stdout.
Spill behaviour is configured with SORTKIT_MAX_CACHE_RECORDS,
SORTKIT_MAX_OPEN_FILES, SORTKIT_TEMP_DIR and SORTKIT_FILE_PREFIX.";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    input: Option<PathBuf>,
    reverse: bool,
    help: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        for arg in args {
            match arg.as_str() {
                "-r" | "--reverse" => parsed.reverse = true,
                "-h" | "--help" => parsed.help = true,
                flag if flag.starts_with('-') && flag != "-" => {
                    return Err(format!("unknown option: {flag}"));
                }
                path => {
                    if parsed.input.is_some() {
                        return Err(format!("unexpected extra input: {path}"));
                    }
                    if path != "-" {
                        parsed.input = Some(PathBuf::from(path));
                    }
                }
            }
        }
        Ok(parsed)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sortkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return;
    }

    let config = match SorterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid sorter configuration");
            std::process::exit(1);
        }
    };
    tracing::debug!(
        max_cache_record_num = config.max_cache_record_num,
        max_open_file_num = config.max_open_file_num,
        temp_dir = %config.temp_dir.display(),
        "loaded configuration"
    );

    let input = args.input.as_deref();
    let result = if args.reverse {
        sort_lines(config, ReverseOrder(NaturalOrder), input)
    } else {
        sort_lines(config, NaturalOrder, input)
    };
    match result {
        Ok(lines) => tracing::info!(lines, "sort complete"),
        Err(e) => {
            tracing::error!(error = %e, "sort aborted");
            std::process::exit(1);
        }
    }
}

/// Sort the lines of `input` (stdin if `None`) to stdout. Returns the number
/// of lines written.
fn sort_lines<C>(config: SorterConfig, comparator: C, input: Option<&Path>) -> Result<u64, SorterError>
where
    C: Comparator<Vec<u8>> + Clone,
{
    let mut sorter = ExternalSorter::new(config, comparator, BytesCodec)?;

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(std::io::stdin().lock()),
    };
    for line in reader.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        sorter.add_record(line)?;
    }

    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut written = 0;
    while let Some(line) = sorter.get_record()? {
        out.write_all(&line)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    sorter.close()?;
    Ok(written)
}
