use std::error::Error;
use std::io::BufReader;

use clap::{Parser, ValueEnum};
use clap_stdin::FileOrStdin;

use zarac::source::read_until_sentinel;
use zarac::Compilation;

/// Compiles a Zara program to three-address code.
#[derive(Parser, Debug)]
#[command(name = "zarac")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file (use "-" for stdin)
    #[arg(value_name = "INPUT", default_value = "-")]
    input: FileOrStdin,

    /// Which stage to print
    #[arg(long, value_name = "STAGE", default_value = "tac")]
    emit: EmitStage,

    /// Stop reading at the first line equal to this one, e.g. END
    #[arg(long, value_name = "LINE")]
    sentinel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmitStage {
    /// Token stream
    Tokens,
    /// Syntax tree
    Ast,
    /// Every declared symbol
    Symbols,
    /// Three-address code
    Tac,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let source = match &args.sentinel {
        Some(sentinel) => {
            let reader = BufReader::new(args.input.into_reader()?);
            read_until_sentinel(reader, sentinel)?
        }
        None => args.input.contents()?,
    };

    let compilation = zarac::compile(&source)?;
    print!("{}", render(&compilation, args.emit));
    Ok(())
}

fn render(compilation: &Compilation, stage: EmitStage) -> String {
    let mut out = String::new();
    match stage {
        EmitStage::Tokens => {
            for token in compilation.tokens.iter() {
                out += &format!("({:?}, {:?})\n", token.kind, token.lexeme);
            }
        }
        EmitStage::Ast => out += &format!("{:#?}\n", compilation.program.program),
        EmitStage::Symbols => {
            for symbol in compilation.program.declarations.iter() {
                out += &format!("{}: {} (depth {})\n", symbol.name, symbol.ty, symbol.depth);
            }
        }
        EmitStage::Tac => {
            for instruction in compilation.code.iter() {
                out += &format!("{instruction}\n");
            }
        }
    }
    out
}
