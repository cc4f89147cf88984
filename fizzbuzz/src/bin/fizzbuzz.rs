use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "fizzbuzz", about = "Print FizzBuzz from 1 up to LIMIT", version)]
struct Cli {
    /// Last number to print (positive integer)
    #[arg(default_value = "100", allow_hyphen_values = true)]
    limit: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let terms = match fizzbuzz::parse_limit(&cli.limit).and_then(fizzbuzz::fizzbuzz) {
        Ok(terms) => terms,
        Err(e) => {
            println!("{e}");
            return ExitCode::from(1);
        }
    };

    let mut out = BufWriter::new(io::stdout().lock());
    for term in terms {
        if writeln!(out, "{term}").is_err() {
            return ExitCode::from(1);
        }
    }
    match out.flush() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(1),
    }
}
