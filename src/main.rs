// src/main.rs

use tensordag::{cli, logging, run};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("tensordag error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init(args.log_level)?;
    run(args)?;
    Ok(())
}
