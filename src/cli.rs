use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

/// contextsweep CLI definition.
#[derive(Debug, Parser)]
#[command(name = "contextsweep")]
#[command(
    about = "Sweep a question set across prompt contexts and record every LLM response",
    version
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Verbose logs with timestamps and targets")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(
        long,
        global = true,
        requires = "log_json",
        help = "Pretty-print JSON logs"
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Query every question under every context and append the results.
    Run(RunArgs),
    /// Summarize an existing output file.
    Status(StatusArgs),
    /// Send a single prompt with the configured model and print the reply.
    Probe(ProbeArgs),
}

/// Model, credential and retry overrides shared by `run` and `probe`.
#[derive(Debug, Args, Clone, Default)]
pub struct ModelArgs {
    #[arg(long, help = "YAML configuration file; flags override its values")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        help = "LLM provider backend (anthropic, openai, gemini, grok)"
    )]
    pub llm_provider: Option<LlmProvider>,

    #[arg(long, help = "LLM provider API key (can also come from env vars)")]
    pub api_key: Option<String>,

    #[arg(long, help = "Model identifier")]
    pub model: Option<String>,

    #[arg(long, help = "Maximum output tokens per response")]
    pub max_tokens: Option<u64>,

    #[arg(long, help = "Sampling temperature")]
    pub temperature: Option<f64>,

    #[arg(long, help = "Total attempts per request before giving up")]
    pub max_attempts: Option<u32>,

    #[arg(long, help = "Shortest wait between attempts, in seconds")]
    pub min_delay_secs: Option<f64>,

    #[arg(long, help = "Longest wait between attempts, in seconds")]
    pub max_delay_secs: Option<f64>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, help = "Questions file (one JSON object per line)")]
    pub questions: Option<PathBuf>,

    #[arg(long, help = "Contexts file (one JSON object per line)")]
    pub contexts: Option<PathBuf>,

    #[arg(long, help = "Output file; records are appended")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Also ask every question once without any context")]
    pub no_context_pass: bool,

    #[arg(long, help = "Skip the question x context pass")]
    pub skip_context_pass: bool,

    #[arg(
        long,
        help = "Skip pairs this model already answered in the output"
    )]
    pub skip_completed: bool,
}

#[derive(Debug, Args, Clone, Default)]
pub struct StatusArgs {
    #[arg(long, help = "Output file to summarize (defaults to the configured output)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "YAML configuration file used to locate the output")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Print the summary as JSON")]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, help = "Prompt text to send verbatim")]
    pub prompt: String,
}

/// Supported LLM providers surfaced via the CLI and the config file.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Deserialize)]
#[clap(rename_all = "lower")]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    Openai,
    Gemini,
    Grok,
}

impl LlmProvider {
    pub fn env_var(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::Openai => "OPENAI_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::Grok => "XAI_API_KEY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Openai => "openai",
            LlmProvider::Gemini => "gemini",
            LlmProvider::Grok => "grok",
        }
    }
}
