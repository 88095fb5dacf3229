//! Command-line driver for the ESP-to-JavaScript transformer.

#![allow(clippy::print_stdout)]

use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use esp::{EspConfig, Reader};

/// Translates an ESP template into plain JavaScript source text.
#[derive(Debug, Parser)]
#[command(author, version, about, name = "esp")]
struct Cli {
    /// ESP template to translate. Reads from stdin if omitted.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Write the translated JavaScript here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the default `out=response.writer;` prologue.
    #[arg(long, value_name = "STATEMENT")]
    out_init: Option<String>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let template = read_template(cli.input.as_deref()).wrap_err("could not read ESP template")?;

    let mut config = EspConfig::default();
    if let Some(statement) = cli.out_init {
        config = config.out_init(statement);
    }

    let mut reader = Reader::from_str(&template, config);
    let mut translated = String::new();
    while let Some(c) = reader.read_one().wrap_err("error reading ESP template")? {
        translated.push(c);
    }

    write_output(cli.output.as_deref(), &translated).wrap_err("could not write translated output")
}

fn read_template(path: Option<&std::path::Path>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, translated: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, translated),
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(translated.as_bytes())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("logger should only be initialized once");
}
