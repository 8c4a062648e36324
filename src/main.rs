use clap::Parser;
use log::{debug, info};
use raven::{
    Environment, Error, parse_str, run,
    cli::{Args, Commands},
    tokenize,
};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn read_source(file: &Path) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(source) => Some(source),
        Err(err) => {
            eprintln!("Could not read {}: {}", file.display(), err);
            None
        }
    }
}

fn report(err: &Error, id: &str, source: &str) {
    if err.pretty_print(id, source).is_err() {
        eprintln!("{}", err);
    }
}

fn run_file(file: &Path) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::FAILURE;
    };
    let id = file.display().to_string();
    let env = Environment::new_global_populated();

    match run(&source, &env) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err, &id, &source);
            ExitCode::FAILURE
        }
    }
}

fn check_file(file: &Path) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::FAILURE;
    };
    let id = file.display().to_string();

    match parse_str(&source) {
        Ok(program) => {
            println!("{}", program);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&Error::from(err), &id, &source);
            ExitCode::FAILURE
        }
    }
}

fn print_tokens(file: &Path) -> ExitCode {
    let Some(source) = read_source(file) else {
        return ExitCode::FAILURE;
    };
    let id = file.display().to_string();

    match tokenize(&source) {
        Ok(tokens) => {
            for token in tokens {
                println!("{:>9} {:<12} {}", token.span.to_string(), token.kind.to_string(), token);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            if err.pretty_print(&id, &source).is_err() {
                eprintln!("{}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Run { file } => {
            info!("RUN MODE");
            debug!("file: {:?}", file);
            run_file(&file)
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);
            check_file(&file)
        }
        Commands::Tokens { file } => {
            info!("TOKENS MODE");
            debug!("file: {:?}", file);
            print_tokens(&file)
        }
    }
}
