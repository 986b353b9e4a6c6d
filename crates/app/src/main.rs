mod args;
mod local;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Archive, Archived, Auth, Delete, Ids, Inbox, Init, SendEmail, Setup, Version};
use state::{AppConfig, AppState};

command_enum! {
    (Init, Init),
    (Version, Version),
    (Auth, Auth),
    (Setup, Setup),
    (Ids, Ids),
    (Send, SendEmail),
    (Inbox, Inbox),
    (Archived, Archived),
    (Archive, Archive),
    (Delete, Delete),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // an uninitialized directory still gets default logging
    let config = AppState::load(args.config_path.clone())
        .map(|state| state.config)
        .unwrap_or_else(|_| AppConfig::default());
    let guards = logging::init_logging(&config);

    let ctx = op::OpContext::new(args.config_path);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush buffered log lines before exiting
    drop(guards);
    std::process::exit(code);
}
