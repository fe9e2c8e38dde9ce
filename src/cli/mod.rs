//! CLI argument parsing and command dispatch.

pub mod args;
pub mod generate;
pub mod providers;

use std::io::Read;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::credentials::CredentialRegistry;
use crate::core::router::Router;
use crate::error::Result;
use crate::storage::ResolvedConfig;

/// Run the parsed command. `None` prints the quickstart text.
///
/// # Errors
///
/// Returns whatever the command fails with; the caller renders it.
pub async fn run(cli: &Cli) -> Result<()> {
    let format = cli.effective_format();

    let Some(command) = &cli.command else {
        print_quickstart();
        return Ok(());
    };

    let config = ResolvedConfig::resolve(cli.config.as_deref(), cli.pretty)?;
    tracing::debug!(
        path = %config.path.display(),
        source = %config.path_source,
        timeout_source = %config.timeout_source,
        "Configuration resolved"
    );
    let router = Router::new(config.router, CredentialRegistry::from_env())?;
    let pretty = config.pretty;

    match command {
        Commands::Text(args) => generate::text(&router, args, format, pretty).await,
        Commands::Image(args) => generate::image(&router, args, format, pretty).await,
        Commands::Speak(args) => generate::speak(&router, args, format, pretty).await,
        Commands::Transcribe(args) => generate::transcribe(&router, args, format, pretty).await,
        Commands::Providers => providers::execute(&router, format, pretty),
    }
}

/// Argument text, or stdin when the argument is `-`.
pub(crate) fn read_input(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn print_quickstart() {
    println!(
        r#"aigate - AI service router

Routes text, image, speech and transcription requests across providers
with validation, local rate limits and ordered failover.

USAGE:
    aigate [OPTIONS] <COMMAND>

COMMANDS:
    text        Generate text from a prompt
    image       Generate an image from a prompt
    speak       Synthesize speech into a file
    transcribe  Transcribe an audio file
    providers   Show priority lists and credential state

QUICK START:
    export OPENAI_API_KEY=...
    aigate text "Summarize the water cycle in two sentences"
    aigate image "a lighthouse at dusk, watercolor" --width 512 --height 512
    aigate speak "Welcome to the course" --out welcome.mp3
    aigate transcribe lecture.wav
    aigate providers --json

For more help: aigate --help
Version: {}"#,
        env!("CARGO_PKG_VERSION")
    );
}
