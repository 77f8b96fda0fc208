use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use logic_flow_engine::{Expression, FlowDefinition, Lexer, TruthTable, parse::DEFAULT_MAX_DEPTH};
use miette::IntoDiagnostic;
use miette::WrapErr;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate boolean expressions, rule flows and truth tables")]
struct Args {
    /// Log filter, in `tracing_subscriber::EnvFilter` syntax.
    #[arg(long, global = true, env = "LOGIC_FLOW_LOG", default_value = "warn")]
    log: String,

    /// Deepest nesting accepted in an expression.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Tokenize {
        expr: String,
    },
    Parse {
        expr: String,
    },
    Eval {
        expr: String,
        /// Variable binding, e.g. `--var A=true`.
        #[arg(long = "var", value_name = "NAME=BOOL", value_parser = parse_binding)]
        vars: Vec<(String, bool)>,
    },
    Table {
        expr: String,
        #[arg(required = true)]
        variables: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Runs a JSON flow definition: `{"context": {...}, "steps": [...]}`.
    Flow {
        filename: PathBuf,
    },
}

fn parse_binding(s: &str) -> Result<(String, bool), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BOOL, got `{s}`"))?;
    let value = match value.trim() {
        "true" | "True" | "1" => true,
        "false" | "False" | "0" => false,
        other => return Err(format!("`{other}` is not a boolean")),
    };
    Ok((name.trim().to_string(), value))
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).into_diagnostic()?)
        .with_writer(std::io::stderr)
        .init();

    let compile = |expr: &str| {
        Expression::compile_with(logic_flow_engine::Parser::new(expr).with_max_depth(args.max_depth))
    };

    match args.command {
        Commands::Tokenize { expr } => {
            for token in Lexer::new(&expr) {
                let token = token?;
                println!("{token}");
            }
            println!("EOF");
        }
        Commands::Parse { expr } => {
            let expression = compile(&expr)?;
            println!("{}", expression.root());
        }
        Commands::Eval { expr, vars } => {
            let bindings: HashMap<String, bool> = vars.into_iter().collect();
            let expression = compile(&expr)?;
            println!("{}", expression.evaluate(&bindings)?);
        }
        Commands::Table {
            expr,
            variables,
            json,
        } => {
            let table = TruthTable::generate(&compile(&expr)?, &variables)?;
            if json {
                let out = serde_json::to_string_pretty(&table).into_diagnostic()?;
                println!("{out}");
            } else {
                print!("{table}");
            }
        }
        Commands::Flow { filename } => {
            let file_contents = fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

            let definition: FlowDefinition = serde_json::from_str(&file_contents)
                .into_diagnostic()
                .wrap_err_with(|| format!("`{}` is not a valid flow", filename.display()))?;

            let context = definition.run()?;
            let out = serde_json::to_string_pretty(&context).into_diagnostic()?;
            println!("{out}");
        }
    }
    Ok(())
}
