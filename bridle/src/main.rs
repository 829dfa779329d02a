use clap::Parser as ClapParser;
use std::path::{Path, PathBuf};
use std::process;

use bridle::{Driver, DriverOptions, Encoding, bridle_file_name};
use log::info;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bridle source file to compile
    #[arg(help = "The .nsi file to compile")]
    input: PathBuf,

    /// Output file, `<stem>.bridle.nsi` next to the input by default
    #[arg(short, long, help = "Write the compiled script to FILE")]
    output: Option<PathBuf>,

    /// Directory for compiled include files
    #[arg(short = 'd', long, help = "Directory for generated include files")]
    out_dir: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = "utf-8",
        help = "Input and output encoding: utf-8, utf-16le or utf-16be"
    )]
    encoding: Encoding,

    /// Include files to copy as they are
    #[arg(
        short = 'x',
        long,
        help = "Copy this include file instead of compiling it"
    )]
    exclude: Vec<PathBuf>,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "More output, repeat for more"
    )]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base_dir = cli
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let Some(input_name) = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
    else {
        eprintln!("Error: '{}' is not a file", cli.input.display());
        process::exit(1);
    };
    let output = cli
        .output
        .unwrap_or_else(|| base_dir.join(bridle_file_name(&input_name)));
    let out_dir = cli.out_dir.unwrap_or_else(|| {
        output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });

    let mut driver = Driver::new(DriverOptions {
        base_dir,
        out_dir,
        encoding: cli.encoding,
        exclude: cli.exclude,
    });

    if let Err(err) = driver.compile(&input_name, &output) {
        eprintln!("Error compiling {}: {}", cli.input.display(), err);
        process::exit(1);
    }
    info!(
        "Compiled {} lines in {} file(s)",
        driver.input_lines(),
        driver.file_count()
    );
    println!("{}", output.display());
}
