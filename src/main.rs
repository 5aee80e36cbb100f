use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use conditions::lex::TokenKind;
use conditions::{CompileError, CompileErrors, Condition, Environment, Lexer, Object};
use miette::IntoDiagnostic;
use miette::WrapErr;

const EXIT_COMPILE: u8 = 65;
const EXIT_RUNTIME: u8 = 70;

#[derive(Parser, Debug)]
#[command(version, about = "Lex, parse, check and evaluate conditions")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct Input {
    /// Condition text.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    expression: Option<String>,

    /// Read the condition from a file instead.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl Input {
    fn read(&self) -> miette::Result<String> {
        match (&self.expression, &self.file) {
            (Some(expression), _) => Ok(expression.clone()),
            (None, Some(filename)) => fs::read_to_string(filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display())),
            (None, None) => Err(miette::miette!("no condition given")),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print one token per line.
    Tokenize {
        #[command(flatten)]
        input: Input,
    },
    /// Print the parsed condition, fully parenthesized.
    Parse {
        #[command(flatten)]
        input: Input,
    },
    /// Print the static result type.
    Check {
        #[command(flatten)]
        input: Input,
    },
    /// Evaluate against the given bindings.
    Eval {
        #[command(flatten)]
        input: Input,

        /// Bind NAME to VALUE; VALUE is read as JSON, else as a plain string.
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, String)>,

        /// Like --var, but the binding cannot be overwritten.
        #[arg(long = "const", value_name = "NAME=VALUE", value_parser = parse_binding)]
        consts: Vec<(String, String)>,

        /// JSON object of bindings, loaded before --const and --var.
        #[arg(long, value_name = "FILE")]
        bindings: Option<PathBuf>,
    },
}

fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

fn value(raw: &str) -> miette::Result<Object> {
    let json = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok(Object::try_from(json)?)
}

fn environment(
    bindings: Option<PathBuf>,
    consts: Vec<(String, String)>,
    vars: Vec<(String, String)>,
) -> miette::Result<Environment> {
    let mut env = Environment::new();
    if let Some(filename) = bindings {
        let contents = fs::read_to_string(&filename)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("`{}` is not a JSON object", filename.display()))?;
        for (name, json) in map {
            let object = Object::try_from(json).wrap_err_with(|| format!("binding `{name}`"))?;
            env.set(name, object)?;
        }
    }
    for (name, raw) in consts {
        let object = value(&raw)?;
        env.set_readonly(name, object)?;
    }
    for (name, raw) in vars {
        let object = value(&raw)?;
        env.set(name, object)?;
    }
    Ok(env)
}

fn compile_failed(source: &str, errors: Vec<CompileError>) -> ExitCode {
    eprintln!("{:?}", miette::Report::new(CompileErrors::new(source, errors)));
    ExitCode::from(EXIT_COMPILE)
}

fn main() -> miette::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Tokenize { input } => {
            let source = input.read()?;
            let mut illegal = false;
            for token in Lexer::new(&source) {
                illegal |= token.kind == TokenKind::Illegal;
                println!("{token}");
            }
            println!("{}", TokenKind::Eof);
            if illegal {
                return Ok(ExitCode::from(EXIT_COMPILE));
            }
        }
        Commands::Parse { input } => {
            let source = input.read()?;
            let (program, errors) = conditions::parse(&source);
            // type errors do not stop the tree from being printed
            let syntax: Vec<_> = errors
                .into_iter()
                .filter(|error| matches!(error, CompileError::Syntax(_)))
                .collect();
            if !syntax.is_empty() {
                return Ok(compile_failed(&source, syntax));
            }
            println!("{program}");
        }
        Commands::Check { input } => {
            let source = input.read()?;
            match Condition::compile(&source) {
                Ok(condition) => println!("{}", condition.result_type()),
                Err(errors) => {
                    eprintln!("{:?}", miette::Report::new(errors));
                    return Ok(ExitCode::from(EXIT_COMPILE));
                }
            }
        }
        Commands::Eval {
            input,
            vars,
            consts,
            bindings,
        } => {
            let source = input.read()?;
            let condition = match Condition::compile(&source) {
                Ok(condition) => condition,
                Err(errors) => {
                    eprintln!("{:?}", miette::Report::new(errors));
                    return Ok(ExitCode::from(EXIT_COMPILE));
                }
            };
            let env = environment(bindings, consts, vars)?;
            match condition.evaluate(&env) {
                Object::Error(error) => {
                    eprintln!("{:?}", miette::Report::new(error));
                    return Ok(ExitCode::from(EXIT_RUNTIME));
                }
                result => println!("{result}"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
