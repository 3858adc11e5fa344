use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use clap::Parser;
use ly::{
    io::{Echo, EmptyLines, LineReader, ScriptedInput, Writer},
    ErrorKind, Input, Options, Output, Program, RuntimeError, Vm,
};

#[derive(Parser, Debug)]
#[command(name = "ly")]
#[command(version)]
#[command(about = "Interpreter for the Ly stack language")]
struct Args {
    /// File to interpret
    file: PathBuf,

    /// Output additional debug information, announcing each output separately
    #[arg(short, long)]
    debug: bool,

    /// Go through the program step-by-step, pressing Enter for each instruction
    #[arg(short, long)]
    slow: bool,

    /// Input for the program, one line per line of text. If not given, you
    /// will be prompted if the program requires input
    #[arg(short, long)]
    input: Option<String>,

    /// Seconds to wait between each execution tick
    #[arg(short, long)]
    time: Option<f64>,

    /// Time the program and output how long it took to finish execution
    #[arg(long)]
    timeit: bool,

    /// Don't prompt for input, no matter what
    #[arg(long)]
    no_input: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.debug {
        "trace"
    } else {
        "warn"
    }))
    .format_timestamp(None)
    .init();

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            log::debug!("reading {:?} failed: {}", args.file, err);
            eprintln!("That file couldn't be found.");
            return ExitCode::FAILURE;
        }
    };

    let program = match Program::parse(&source) {
        Ok(program) => program,
        Err(err) => {
            log::debug!("{:#}", err);
            eprintln!("Error occurred during parsing");
            eprintln!("SyntaxError: Unmatched brackets in program");
            return ExitCode::FAILURE;
        }
    };

    match execute(&args, &program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<RuntimeError>() {
                Some(err) => report(err),
                None => eprintln!("{:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &Args, program: &Program) -> anyhow::Result<()> {
    let delay = args
        .time
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid tick time")?;

    let mut input: Box<dyn Input> = match (&args.input, args.no_input) {
        (Some(text), _) => Box::new(ScriptedInput::from_text(text)),
        (None, true) => Box::new(EmptyLines),
        (None, false) => Box::new(LineReader::stdin()),
    };
    let mut writer = Writer::stdout();
    let mut echo = Echo::new(io::stdout());
    let output: &mut dyn Output = if args.debug { &mut echo } else { &mut writer };

    let options = Options {
        delay,
        ..Options::default()
    };
    let start = Instant::now();
    let outcome = {
        let mut vm = Vm::new(&program.code, input.as_mut(), output, options);
        if args.slow {
            step_through(&mut vm)
        } else {
            vm.run().map_err(Into::into)
        }
    };

    if args.timeit {
        println!(
            "\nTotal execution time in seconds: {}",
            start.elapsed().as_secs_f64()
        );
    }
    if args.debug {
        println!("\nTotal output: {}", echo.transcript());
    }
    outcome
}

/// Run one instruction per line read from standard input.
fn step_through(vm: &mut Vm) -> anyhow::Result<()> {
    let stdin = io::stdin();
    while vm.halt.is_none() {
        vm.step()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(anyhow!("standard input closed during step-by-step execution"));
        }
    }
    Ok(())
}

/// Print a runtime error the way the original tool does, with indices into
/// the preprocessed text.
fn report(err: &RuntimeError) {
    let instruction = |c: Option<char>| c.map(String::from).unwrap_or_else(|| "<end>".to_string());

    match &err.kind {
        ErrorKind::Function { name, source } => {
            let inner = source.innermost();
            eprintln!(
                "Error occurred in function {}, index {}, instruction {} (zero-indexed, excludes comments)",
                name,
                source.index,
                instruction(source.instruction)
            );
            eprintln!("{}: {}", inner.kind.name(), inner.kind);
        }
        kind => {
            eprintln!(
                "Error occurred at program index {}, instruction {} (zero-indexed, excludes comments)",
                err.index,
                instruction(err.instruction)
            );
            eprintln!("{}: {}", kind.name(), kind);
        }
    }
}
