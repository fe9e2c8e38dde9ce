//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::options::RequestOptions;

/// Route AI requests across providers with validation, rate limiting and failover.
#[derive(Parser, Debug)]
#[command(name = "aigate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Emit results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the platform default
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate text from a prompt
    Text(TextArgs),

    /// Generate an image from a prompt
    Image(ImageArgs),

    /// Synthesize speech and write it to a file
    Speak(SpeakArgs),

    /// Transcribe an audio file
    Transcribe(TranscribeArgs),

    /// Show priority lists, credential state and remaining quota
    Providers,
}

/// Options shared by every request.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Model override (ignored by routes that pin a model)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Deadline for the whole call in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

/// Arguments for the `text` command.
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Prompt text, or `-` to read stdin
    pub prompt: String,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl TextArgs {
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..self.request.options()
        }
    }
}

/// Arguments for the `image` command.
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Prompt text, or `-` to read stdin
    pub prompt: String,

    /// Image width in pixels (256 - 1024)
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels (256 - 1024)
    #[arg(long)]
    pub height: Option<u32>,

    /// Diffusion steps (10 - 50)
    #[arg(long)]
    pub steps: Option<u32>,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl ImageArgs {
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            width: self.width,
            height: self.height,
            steps: self.steps,
            ..self.request.options()
        }
    }
}

/// Arguments for the `speak` command.
#[derive(Args, Debug)]
pub struct SpeakArgs {
    /// Text to speak, or `-` to read stdin
    pub text: String,

    /// Where to write the audio
    #[arg(long, short, value_name = "FILE")]
    pub out: PathBuf,

    /// Provider voice identifier
    #[arg(long, value_name = "ID")]
    pub voice_id: Option<String>,

    /// Provider synthesis model identifier
    #[arg(long, value_name = "ID")]
    pub model_id: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl SpeakArgs {
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            voice_id: self.voice_id.clone(),
            model_id: self.model_id.clone(),
            ..self.request.options()
        }
    }
}

/// Arguments for the `transcribe` command.
#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Audio file to transcribe
    pub file: PathBuf,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl RequestArgs {
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            model: self.model.clone(),
            timeout_ms: self.timeout_ms,
            ..RequestOptions::default()
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain output for terminals and pipes
    #[default]
    Human,
    /// Machine-readable JSON
    Json,
}
