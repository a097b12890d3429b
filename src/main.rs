use clap::{crate_version, App, Arg};
use jspp::{Error, ErrorKind, Interpreter, Item, Value};
use num_enum::IntoPrimitive;
use std::fs;
use std::io::{self, Read, Write};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(i32)]
enum ExitCode {
    Success = 0,
    DataError = 65,
    Software = 70,
    IoError = 74,
}

fn main() {
    let matches = App::new("jspp")
        .version(crate_version!())
        .about("Runs programs written in a small statically-typed scripting language")
        .arg(
            Arg::with_name("script")
                .value_name("SCRIPT")
                .help("Source file to run; standard input is read when omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("dump-ast")
                .long("dump-ast")
                .help("Print the tree of each top-level construct instead of running it"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Raise log verbosity (repeatable)"),
        )
        .get_matches();

    init_logging(matches.occurrences_of("verbose"));

    let source = match read_source(matches.value_of("script")) {
        Ok(source) => source,
        Err(message) => exit(io_failure(&message)),
    };

    let status = if matches.is_present("dump-ast") {
        dump_ast(&source)
    } else {
        run(&source)
    };
    exit(status);
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_source(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => {
            info!(path, "reading script");
            fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))
        }
        None => {
            info!("reading script from standard input");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

fn run(source: &str) -> ExitCode {
    let mut interpreter = Interpreter::new();
    match jspp::run(source, &mut interpreter) {
        Ok(Some(value)) => report(&mut io::stdout().lock(), value),
        Ok(None) => ExitCode::Success,
        Err(err) => fail(&err),
    }
}

fn dump_ast(source: &str) -> ExitCode {
    match jspp::parse_program(source) {
        Ok(items) => print_items(&mut io::stdout().lock(), &items),
        Err(err) => fail(&err),
    }
}

fn report<W: Write>(out: &mut W, value: Value) -> ExitCode {
    let written = writeln!(out, "{}() returned: {}", jspp::ENTRY_POINT, value);
    finish(written.and_then(|_| out.flush()))
}

fn print_items<W: Write>(out: &mut W, items: &[Item]) -> ExitCode {
    let written = items.iter().try_for_each(|item| writeln!(out, "{}", item));
    finish(written.and_then(|_| out.flush()))
}

fn finish(written: io::Result<()>) -> ExitCode {
    match written {
        Ok(()) => ExitCode::Success,
        Err(e) => io_failure(&format!("Failed to write output: {}", e)),
    }
}

fn io_failure(message: &str) -> ExitCode {
    eprintln!("Error: {}", message);
    ExitCode::IoError
}

fn fail(err: &Error) -> ExitCode {
    eprintln!("Error: {}", err);
    match err.kind() {
        ErrorKind::Lexical | ErrorKind::Syntax => ExitCode::DataError,
        ErrorKind::Runtime => ExitCode::Software,
    }
}

fn exit(code: ExitCode) -> ! {
    std::process::exit(code.into())
}
