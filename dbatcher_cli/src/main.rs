//! Entrypoint of the dbatcher binary
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::future_not_send
)]

use dotenvy::dotenv;

mod logging;

mod commands {
    pub(crate) mod common;
    pub(crate) mod send;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "dbatcher",
    version,
    about = "Command line client for Dbatcher",
    long_about = r#"Command line client for Dbatcher

Examples:
    # Send rows from a file and let the server buffer them
    dbatcher send -t events --fields id,name --max-rows 1000 --timeout-ms 500 -f rows.json

    # Send rows from stdin and have them inserted immediately
    echo '[[1, "a"]]' | dbatcher send -t events --fields id,name --sync

    # Send rows with debug logging of the exchange
    LOG_FILTER=debug dbatcher send -t events --fields id,name --sync -f rows.json
"#
)]
struct Config {
    #[clap(flatten)]
    logging_config: logging::LoggingConfig,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Send a set of rows to a running Dbatcher server
    Send(commands::send::Config),
}

fn main() -> Result<(), std::io::Error> {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    if let Err(e) = logging::init_logs(&config.logging_config) {
        eprintln!("Initializing logs failed: {e:#}");
        std::process::exit(ReturnCode::Failure as _);
    }

    let tokio_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    tokio_runtime.block_on(async move {
        match config.command {
            None => println!("command required, -h/--help for help"),
            Some(Command::Send(config)) => {
                if let Err(e) = commands::send::command(config).await {
                    eprintln!("Send command failed: {e}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
        }
    });

    Ok(())
}

/// Source the .env file before initialising the Config struct - this sets
/// any envs in the file, which the Config struct then uses.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // Ignore this - a missing env file is not an error, defaults will
            // be applied when initialising the Config struct.
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(1);
        }
    };
}
