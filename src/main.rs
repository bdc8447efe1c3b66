use clap::{Args, Parser as ClapParser, Subcommand};
use std::io::{self, Read};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use whisker::cli::{self, CliError, Command, Outcome, RunOptions};
use whisker::options::ParserOptions;
use whisker::{to_json, to_json_pretty};

#[derive(ClapParser)]
#[command(name = "whisker")]
#[command(about = "Whisker - compile and evaluate Mustache-style template expressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    flags: Flags,
}

#[derive(Args)]
struct Flags {
    /// JSON input (reads from stdin if not provided)
    #[arg(short, long, global = true)]
    input: Option<String>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    /// Only validate syntax, don't execute
    #[arg(long, global = true)]
    syntax_only: bool,

    /// Fail on unresolved paths and unmatched formatter calls
    #[arg(long, global = true)]
    strict: bool,

    /// Open tag delimiter
    #[arg(long, global = true, default_value = "{{")]
    open: String,

    /// Close tag delimiter
    #[arg(long, global = true, default_value = "}}")]
    close: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against JSON input
    Render {
        /// The template text
        template: String,
    },

    /// Evaluate one expression against JSON input
    Eval {
        /// The expression to evaluate
        expression: String,
    },

    /// Print the canonical form of an expression
    Print {
        /// The expression to print
        expression: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let (command, source) = match cli.command {
        Commands::Render { template } => (Command::Render, template),
        Commands::Eval { expression } => (Command::Eval, expression),
        Commands::Print { expression } => (Command::Print, expression),
    };

    if let Err(e) = run(command, source, cli.flags) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Command, source: String, flags: Flags) -> Result<(), CliError> {
    let needs_input = command != Command::Print && !flags.syntax_only;
    let input = match flags.input {
        Some(s) => Some(s),
        None if needs_input && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = RunOptions {
        command,
        source,
        input,
        syntax_only: flags.syntax_only,
        strict: flags.strict,
        parser: ParserOptions::default().with_delimiters(flags.open, flags.close),
    };

    match cli::execute(&options)? {
        Outcome::SyntaxValid => println!("Syntax is valid"),
        Outcome::Rendered(text) => print!("{}", text),
        Outcome::Printed(text) => println!("{}", text),
        Outcome::Evaluated(value) => {
            let json = if flags.pretty {
                to_json_pretty(&value)
            } else {
                to_json(&value)
            };
            println!("{}", json);
        }
    }
    Ok(())
}
