/**
 * Trellis CLI - trellis
 *
 * Compile binding expressions and render templates from the command line
 */
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;
use trellis_cli::{compile_batch, parse_expression, render_template, ParserOptions, RenderRequest};

#[derive(Parser, Debug)]
#[command(name = "trellis", version, about = "Trellis component framework tools")]
struct Cli {
    /// More output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one expression and print its compiled text
    Parse {
        expression: String,
        #[command(flatten)]
        parser: ParserArgs,
    },
    /// Compile a file with one expression per line
    Batch {
        file: PathBuf,
        /// Print results as JSON lines
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        parser: ParserArgs,
    },
    /// Render a template file against a JSON scope and print the HTML
    Render {
        template: PathBuf,
        #[arg(long)]
        scope: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        translations: Option<PathBuf>,
        #[arg(long)]
        locale: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ParserArgs {
    /// Filter call form, e.g. 'filter(%value, "%filter", [%args])'
    #[arg(long)]
    filter_provider: Option<String>,
    /// Root variable form, e.g. 'scope.%name'
    #[arg(long)]
    variable_provider: Option<String>,
    #[arg(long)]
    hoist: bool,
    /// Identifiers matching this regex are not rewritten
    #[arg(long)]
    exclude: Option<String>,
    #[arg(long)]
    auto_wrap: bool,
}

impl From<ParserArgs> for ParserOptions {
    fn from(args: ParserArgs) -> Self {
        ParserOptions {
            filter_provider: args.filter_provider,
            variable_provider: args.variable_provider,
            hoist: args.hoist,
            exclude: args.exclude,
            auto_wrap: args.auto_wrap,
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_optional(path: Option<PathBuf>) -> Result<Option<String>> {
    path.as_deref().map(read).transpose()
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Parse { expression, parser } => {
            let options = ParserOptions::from(parser);
            println!("{}", parse_expression(options.to_config(), &expression)?);
            Ok(0)
        }
        Command::Batch { file, json, parser } => {
            let options = ParserOptions::from(parser);
            let entries = compile_batch(options.to_config(), &read(&file)?)?;
            let mut failed = 0;
            for entry in &entries {
                if entry.error.is_some() {
                    failed += 1;
                }
                if json {
                    println!("{}", serde_json::to_string(entry)?);
                } else {
                    match (&entry.output, &entry.error) {
                        (Some(output), _) => println!("{}", output),
                        (None, Some(error)) => eprintln!("{}:{}: {}", file.display(), entry.line, error),
                        (None, None) => {}
                    }
                }
            }
            Ok(if failed > 0 { 1 } else { 0 })
        }
        Command::Render {
            template,
            scope,
            config,
            translations,
            locale,
        } => {
            let request = RenderRequest {
                template: read(&template)?,
                scope: read_optional(scope)?,
                config: read_optional(config)?,
                translations: read_optional(translations)?,
                locale,
            };
            println!("{}", render_template(&request)?);
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
