use anyhow::Context;
use clap::Parser as ClapParser;
use eplusplus::host::TerminalHost;
use eplusplus::value::Value;
use eplusplus::{parse, Session};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// `statements` always wraps its result in a list, even for a single
/// statement. Print a lone value bare; print a multi-statement result
/// flattened one value per line, matching the REPL's line-by-line output.
fn print_flattened(value: &Value) {
    match value {
        Value::List(items) => {
            let items = items.borrow();
            if items.len() == 1 {
                println!("{}", items[0].display());
            } else {
                for item in items.iter() {
                    println!("{}", item.display());
                }
            }
        }
        other => println!("{}", other.display()),
    }
}

/// E++ interpreter: run a script file, or start an interactive REPL
/// when no file is given.
#[derive(ClapParser, Debug)]
#[command(name = "eplusplus", version, about)]
struct Cli {
    /// Script file to run. Omit to start the REPL.
    file: Option<PathBuf>,

    /// Print the token stream instead of evaluating.
    #[arg(long)]
    tokens: bool,

    /// Print the parsed AST instead of evaluating.
    #[arg(long)]
    ast: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.file {
        Some(path) => run_file(&cli, path),
        None => {
            run_repl(&cli);
            ExitCode::SUCCESS
        }
    }
}

/// Reads a script file off disk. File I/O failures aren't part of the
/// language's own error taxonomy (`LangError`), so they're wrapped in
/// `anyhow` instead, with the path folded into the error chain via `.context`.
fn read_script(path: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

fn run_file(cli: &Cli, path: &PathBuf) -> ExitCode {
    let source = match read_script(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("eplusplus: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let file_name = path.to_string_lossy().to_string();
    let base_dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    // A script that fails to lex, parse or evaluate still exits 0; the
    // interpreter only distinguishes "couldn't even open the file".
    if cli.tokens || cli.ast {
        match parse(file_name.clone(), &source) {
            Ok((tokens, ast)) => {
                if cli.tokens {
                    for tok in &tokens {
                        println!("{}", tok);
                    }
                }
                if cli.ast {
                    let _ = ast.print_tree();
                }
            }
            Err(err) => eprint!("{}", err.render()),
        }
        return ExitCode::SUCCESS;
    }

    let mut session = Session::new(Box::new(TerminalHost), base_dir);
    match session.run_source(file_name, &source) {
        Ok(res) => match res.error {
            Some(err) => eprint!("{}", err.render()),
            None => {
                if let Some(value) = &res.value {
                    print_flattened(value);
                }
            }
        },
        Err(err) => eprint!("{}", err.render()),
    }
    ExitCode::SUCCESS
}

fn run_repl(cli: &Cli) {
    let mut session = Session::new(Box::new(TerminalHost), PathBuf::from("."));
    let mut line = String::new();

    loop {
        print!("E++ > ");
        let _ = io::stdout().flush();
        line.clear();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("eplusplus: {}", e);
                break;
            }
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }

        if cli.tokens || cli.ast {
            match parse("<stdin>", trimmed) {
                Ok((tokens, ast)) => {
                    if cli.tokens {
                        for tok in &tokens {
                            println!("{}", tok);
                        }
                    }
                    if cli.ast {
                        let _ = ast.print_tree();
                    }
                }
                Err(err) => eprint!("{}", err.render()),
            }
            continue;
        }

        match session.run_source("<stdin>", trimmed) {
            Ok(res) => {
                if let Some(err) = res.error {
                    eprint!("{}", err.render());
                } else if let Some(value) = &res.value {
                    print_flattened(value);
                }
            }
            Err(err) => eprint!("{}", err.render()),
        }
    }
}
