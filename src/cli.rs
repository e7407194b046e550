use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kaiwa")]
#[command(author, version, about = "Conversational AI companion bot for Messenger-style platforms", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server
    Run {
        /// Port override (defaults to WEB_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration and exit
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
