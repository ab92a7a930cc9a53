use clap::Parser;
use gwp_cli::config::{CliCommand, Config};
use gwp_cli::settings::Settings;
use gwp_cli::{send, serve};
use log::*;

#[tokio::main]
async fn main() {
    env_logger::init();
    let config: Config = Config::parse();
    let (global_options, command) = config.to_parts();

    let result = match Settings::load_or_default(global_options.config_file.as_ref()) {
        Ok(settings) => {
            debug!("Settings: {settings:?}");
            match command {
                CliCommand::Serve(serve_command) => serve::run(serve_command, settings).await,
                CliCommand::Send(send_command) => send::run(send_command, settings).await,
            }
        }
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => {
            println!("Bye :)")
        }
        Err(err) => {
            eprintln!("** Error ** \n {err}");
            std::process::exit(1);
        }
    }
}
