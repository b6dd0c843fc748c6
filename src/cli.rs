use clap::Parser;
use inquire::Text;

use crate::runtime::{self, RuntimeOptions};

#[derive(Parser)]
struct Cli {
    /// Profile id whose browser session the conversation drives.
    #[arg(long, default_value = "default")]
    profile: String,
}

/// Interactive terminal conversation against the same agent the websocket
/// surface uses. Handy for driving the calendar without a frontend.
pub async fn cli(options: RuntimeOptions) {
    // Fine to panic here
    let cli = Cli::parse();
    let wiring = runtime::build(&options);
    let mut history = wiring.agent.new_history();

    println!("Calendar assistant CLI. Empty line to quit.");
    loop {
        let line = match Text::new("you>").prompt() {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            break;
        }
        let reply = wiring.agent.run_turn(&cli.profile, &mut history, &line).await;
        println!("{}", reply);
    }

    wiring.sessions.shutdown(&cli.profile).await;
}
