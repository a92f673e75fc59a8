//! Ember Viewer
//!
//! Opens a fixed-size window, bootstraps a Vulkan context against it, and
//! idles until the window is closed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p ember-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--validation`: Force validation layers on
//! - `--no-validation`: Force validation layers off
//! - `--any-device-type`: Accept integrated, virtual and CPU devices
//! - `-h, --help`: Print help message
//!
//! Validation defaults to on in debug builds and off in release builds.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use ember_app::{run_app, AppConfig, SuitabilityPolicy};

const TITLE: &str = "Learn Vulkan Window";
const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    help: bool,
    validation: Option<bool>,
    any_device_type: bool,
}

fn parse_options<I: IntoIterator<Item = String>>(args: I) -> Options {
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--validation" => options.validation = Some(true),
            "--no-validation" => options.validation = Some(false),
            "--any-device-type" => options.any_device_type = true,
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
    }
    options
}

fn build_config(options: &Options) -> AppConfig {
    let mut config = AppConfig::new(TITLE).with_size(WIDTH, HEIGHT);
    if let Some(validation) = options.validation {
        config = config.with_validation(validation);
    }
    if options.any_device_type {
        config = config.with_suitability(SuitabilityPolicy::default().any_device_type());
    }
    config
}

fn main() -> anyhow::Result<()> {
    let options = parse_options(std::env::args().skip(1));
    if options.help {
        print_help();
        return Ok(());
    }

    run_app(build_config(&options))
}

fn print_help() {
    eprintln!(
        "Ember Viewer

Opens a {WIDTH}x{HEIGHT} window and brings up a Vulkan context.

USAGE:
    ember-viewer [OPTIONS]

OPTIONS:
    --validation         Force validation layers on
    --no-validation      Force validation layers off
    --any-device-type    Accept non-discrete GPUs
    -h, --help           Print this help message

ENVIRONMENT:
    RUST_LOG             Log filter (default: info)"
    );
}
