use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gogen::config::{self, Config};
use gogen::{AstNode, Decl, DeclKind, Error, Loader};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gogen")]
#[command(about = "Structural queries over Go packages", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./gogen.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List type, const, var and func declarations with their positions
    Decls {
        /// Only list declarations of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// A directory, or Go files (defaults to the current directory)
        names: Vec<PathBuf>,
    },

    /// Load and resolve a package, reporting every diagnostic
    Check {
        /// A directory, or Go files (defaults to the current directory)
        names: Vec<PathBuf>,
    },

    /// Search for an ast-grep pattern such as `fmt.Println($$$ARGS)`
    Find {
        pattern: String,

        /// A directory, or Go files (defaults to the current directory)
        names: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Type,
    Const,
    Var,
    Func,
}

impl From<KindArg> for DeclKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Type => DeclKind::Type,
            KindArg::Const => DeclKind::Const,
            KindArg::Var => DeclKind::Var,
            KindArg::Func => DeclKind::Func,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_ref())?;
    let loader = Loader::new(config);

    match cli.command {
        Commands::Decls { kind, json, names } => cmd_decls(&loader, &names, kind, json),
        Commands::Check { names } => cmd_check(&loader, &names),
        Commands::Find { pattern, names } => cmd_find(&loader, &pattern, &names),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        None => config::discover(".").context("loading gogen.toml"),
    }
}

#[derive(Serialize)]
struct DeclRow {
    kind: &'static str,
    name: String,
    file: String,
    line: usize,
    column: usize,
}

fn kind_name(kind: DeclKind) -> &'static str {
    match kind {
        DeclKind::Type => "type",
        DeclKind::Const => "const",
        DeclKind::Var => "var",
        DeclKind::Func => "func",
    }
}

/// Name identifiers of a declaration, paired with their display names.
fn named_nodes<'a>(decl: &Decl<'a>) -> Vec<(String, Option<AstNode<'a>>)> {
    match decl {
        Decl::Type(spec) => vec![(spec.name().to_string(), spec.name_node())],
        Decl::Const(spec) | Decl::Var(spec) => spec
            .name_nodes()
            .into_iter()
            .map(|n| (n.text().to_string(), Some(n)))
            .collect(),
        Decl::Func(func) => {
            let name = match func.receiver_type_name() {
                Some(recv) => format!("{recv}.{}", func.name()),
                None => func.name().to_string(),
            };
            vec![(name, func.name_node())]
        }
    }
}

fn cmd_decls(loader: &Loader, names: &[PathBuf], kind: Option<KindArg>, json: bool) -> Result<()> {
    let fs = loader.load(names)?;
    let wanted = kind.map(DeclKind::from);

    let mut rows = Vec::new();
    fs.each_decl(|decl| {
        if wanted.is_some_and(|k| k != decl.kind()) {
            return true;
        }
        for (name, node) in named_nodes(&decl) {
            let position = node.unwrap_or_else(|| decl.node());
            let Some(position) = fs.position_of(position) else {
                continue;
            };
            rows.push(DeclRow {
                kind: kind_name(decl.kind()),
                name,
                file: position.filename,
                line: position.line,
                column: position.column,
            });
        }
        true
    });

    if json {
        let out = serde_json::to_string_pretty(&rows).context("serializing declarations")?;
        println!("{out}");
        return Ok(());
    }

    for row in &rows {
        println!(
            "{}:{}:{}: {} {}",
            row.file,
            row.line,
            row.column,
            format!("{:<5}", row.kind).cyan(),
            row.name.bold()
        );
    }
    Ok(())
}

fn cmd_check(loader: &Loader, names: &[PathBuf]) -> Result<()> {
    let fs = match loader.load(names) {
        Ok(fs) => fs,
        Err(Error::Resolve(err)) => {
            for diagnostic in &err.diagnostics {
                eprintln!("{} {}", "✗".red(), diagnostic);
            }
            eprintln!(
                "{}",
                format!("{} errors", err.diagnostics.len()).red().bold()
            );
            std::process::exit(1);
        }
        Err(Error::Parse(err)) => {
            eprintln!("{} {}", "✗".red(), err);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    println!(
        "{} package {}: {} files, {} types, {} funcs",
        "ok".green().bold(),
        fs.package().name,
        fs.files().len(),
        fs.types().len(),
        fs.funcs().len()
    );
    Ok(())
}

fn cmd_find(loader: &Loader, pattern: &str, names: &[PathBuf]) -> Result<()> {
    let fs = loader.load(names)?;
    let matches = fs.find_pattern(pattern)?;

    for m in &matches {
        let Some(position) = fs.position(m.pos) else {
            continue;
        };
        let first_line = m.text.lines().next().unwrap_or("");
        println!("{}: {}", position.to_string().dimmed(), first_line);
        for (name, text) in &m.captures {
            println!("    {} = {}", format!("${name}").yellow(), text);
        }
    }
    if matches.is_empty() {
        eprintln!("{}", "no matches".yellow());
    }
    Ok(())
}
