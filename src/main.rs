use clap::Parser;

use cable_search::config::{Args, Settings};
use cable_search::instance::Instance;
use cable_search::report::{self, ProgressLine, Summary};
use cable_search::shared::ProgressEvent;
use cable_search::{logging, search, validate};

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> cable_search::Result<()> {
    let settings = Settings::resolve(args)?;
    logging::init_logger(settings.log_level, settings.log_timestamps)?;

    if args.validate {
        validate::validate_known_instances()?;
        println!("Validation OK: evaluator and bundled rack match known scores.");
        return Ok(());
    }

    let instance = match &settings.input {
        Some(path) => Instance::load(path)?,
        None => Instance::sample()?,
    };
    log::info!(
        "main: input={} items={}",
        settings
            .input
            .as_ref()
            .map_or_else(|| "<bundled>".to_string(), |p| p.display().to_string()),
        instance.item_count()
    );

    println!("{}\n", report::title(settings.search.strategy));
    println!("{}", report::HEADER);
    let print = |e: &ProgressEvent| println!("{}", ProgressLine(e));
    let outcome = search::run_search(&instance, &settings.search, &print)?;

    println!("\n{}", Summary(&outcome));
    Ok(())
}
