use anyhow::Context;

fn main() -> anyhow::Result<()> {
  let args: Vec<String> = std::env::args().collect();

  if args.iter().any(|a| a == "--version") {
    println!("{}", env!("CARGO_PKG_VERSION"));
    return Ok(());
  }

  if args.iter().any(|a| a == "--help" || a == "-h") {
    println!("{}", entrypoint::USAGE);
    return Ok(());
  }

  entrypoint::run(&args).context("entrypoint")
}
