use holdplan::{
    cli::{Args, BaseCommand, Command},
    logger,
};
use log::LevelFilter;

fn main() {
    let mut args = pico_args::Arguments::from_env();

    let level = if args.contains(["-v", "--verbose"]) {
        LevelFilter::Debug
    } else {
        logger::level_from_env()
    };

    let result = logger::init(level)
        .and_then(|()| BaseCommand::try_from_cli_args(Args::new(args)))
        .and_then(BaseCommand::run);

    match result {
        Ok(output) => println!("{}", output),
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!("Try 'holdplan --help' for more information.");
            std::process::exit(1);
        }
    }
}
