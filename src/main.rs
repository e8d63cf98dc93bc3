use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clip2::config::{Config, CONFIG_ENV};
use clip2::logging::{self, LOG_ENV};
use clip2::{ImageProcessor, UsageError};

const USAGE: &str = "Usage: clip2-process <image_path>";

#[derive(Debug, Default)]
struct Args {
    image_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    extra: Vec<OsString>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut iter = std::env::args_os().skip(1);
    let mut options_done = false;

    while let Some(arg) = iter.next() {
        if !options_done {
            match arg.to_str() {
                Some("--help" | "-h") => {
                    print_help();
                    std::process::exit(0);
                }
                Some("--version" | "-V") => {
                    println!("clip2-process {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                Some("--config" | "-c") => {
                    match iter.next() {
                        Some(path) => args.config_path = Some(PathBuf::from(path)),
                        None => usage_exit("--config requires a path argument"),
                    }
                    continue;
                }
                Some("--") => {
                    options_done = true;
                    continue;
                }
                _ => {}
            }
        }

        if args.image_path.is_none() {
            args.image_path = Some(PathBuf::from(arg));
        } else {
            args.extra.push(arg);
        }
    }

    args
}

fn print_help() {
    println!(
        r#"clip2-process - caption and CLIP embedding for one image

USAGE:
    clip2-process [OPTIONS] <image_path>

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message
    --                  End of options; an image path starting with '-' goes after it

OUTPUT:
    One JSON line on stdout: {{"caption": "...", "embedding": [512 floats]}}

ENVIRONMENT:
    {config_env}        Path to config file (overrides default location)
    {log_env}           Log level (trace, debug, info, warn, error)
    ORT_DYLIB_PATH      ONNX Runtime shared library

Config file location: $XDG_CONFIG_HOME/clip2/config.toml"#,
        config_env = CONFIG_ENV,
        log_env = LOG_ENV,
    );
}

fn usage_exit(message: &str) -> ! {
    eprintln!("{}", UsageError::new(message).to_json_line());
    std::process::exit(1);
}

fn main() -> ExitCode {
    let args = parse_args();

    let Some(image_path) = args.image_path else {
        usage_exit(USAGE);
    };

    // An explicitly named config must load; the default location is best-effort
    let (config, config_warning) = match &args.config_path {
        Some(path) => match Config::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => usage_exit(&format!("{:#}", e)),
        },
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    if let Err(e) = logging::init(&config.logging) {
        let _ = logging::init_stderr();
        tracing::warn!("Logging setup failed, using stderr: {:#}", e);
    }
    if let Some(e) = config_warning {
        tracing::warn!("Ignoring config file: {:#}", e);
    }
    if !args.extra.is_empty() {
        tracing::debug!(extra = ?args.extra, "Ignoring extra arguments");
    }

    let processor = ImageProcessor::from_config(&config);
    let description = processor.process(&image_path);

    let mut stdout = std::io::stdout().lock();
    match writeln!(stdout, "{}", description.to_json_line()).and_then(|_| stdout.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Failed to write result: {}", e);
            ExitCode::FAILURE
        }
    }
}
