use std::env;
use std::fs;
use std::process;

use quadc::{CompilationUnit, Vocabulary, listing, token_listing};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_target(false)
    .with_level(true)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let mut args: Vec<String> = env::args().collect();
  let tokens_only = args.get(1).is_some_and(|arg| arg == "--tokens");
  if tokens_only {
    args.remove(1);
  }
  if args.len() < 2 || args.len() > 3 {
    let program = args.first().map(String::as_str).unwrap_or("quadc");
    eprintln!("usage: {program} [--tokens] <source> [output]");
    process::exit(1);
  }

  let source = match fs::read_to_string(&args[1]) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("cannot read {}: {err}", args[1]);
      process::exit(1);
    }
  };

  let mut unit = CompilationUnit::new(Vocabulary::default());
  let (text, failed) = if tokens_only {
    match unit.tokenize(&source) {
      Ok(tokens) => (token_listing(tokens, None), false),
      Err(err) => {
        eprintln!("lexical error: {err}");
        (token_listing(unit.tokens(), Some(&err)), true)
      }
    }
  } else {
    match unit.compile(&source) {
      Ok(quads) => (listing(quads), false),
      Err(err) => {
        eprintln!("{err}");
        let partial = unit.quadruples();
        if !partial.is_empty() {
          eprintln!("partial output:");
          eprint!("{}", listing(partial));
        }
        process::exit(1);
      }
    }
  };

  match args.get(2) {
    Some(path) => {
      if let Err(err) = fs::write(path, text) {
        eprintln!("cannot write {path}: {err}");
        process::exit(1);
      }
    }
    None => print!("{text}"),
  }
  if failed {
    process::exit(1);
  }
}
