use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::{
    batch::BatchOptions,
    cli::{LlmProvider, ModelArgs, RunArgs},
    core::GenerationSettings,
    retry::BackoffPolicy,
};

/// Longest wait allowed between two attempts, in seconds.
pub const MAX_DELAY_CAP_SECS: f64 = 86_400.0;

/// Everything a sweep needs, after defaults, the YAML file and CLI flags are merged.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub questions: PathBuf,
    pub contexts: PathBuf,
    pub output: PathBuf,
    pub provider: LlmProvider,
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f64,
    pub no_context_pass: bool,
    pub context_pass: bool,
    pub skip_completed: bool,
    pub retry: RetryConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            questions: PathBuf::from("openended_questions.jsonl"),
            contexts: PathBuf::from("prompts_v3.jsonl"),
            output: PathBuf::from("openended_results_promptsv3.jsonl"),
            provider: LlmProvider::Anthropic,
            model: "claude-3-opus-20240229".to_string(),
            max_tokens: 1500,
            temperature: 0.0,
            no_context_pass: false,
            context_pass: true,
            skip_completed: false,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            multiplier: policy.multiplier,
            min_delay_secs: policy.min_delay.as_secs_f64(),
            max_delay_secs: policy.max_delay.as_secs_f64(),
        }
    }
}

impl SweepConfig {
    /// Loads the YAML file when given, otherwise starts from the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file at {}", path_ref.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid configuration in {}", path_ref.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).context("Unable to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// File-or-default config with `run` flags layered on top, validated.
    pub fn for_run(args: &RunArgs) -> Result<Self> {
        let mut config = Self::load(args.model.config.as_deref())?;
        config.apply_model_args(&args.model);
        if let Some(path) = &args.questions {
            config.questions = path.clone();
        }
        if let Some(path) = &args.contexts {
            config.contexts = path.clone();
        }
        if let Some(path) = &args.output {
            config.output = path.clone();
        }
        if args.no_context_pass {
            config.no_context_pass = true;
        }
        if args.skip_context_pass {
            config.context_pass = false;
        }
        if args.skip_completed {
            config.skip_completed = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// File-or-default config with the shared model flags layered on top, validated.
    pub fn for_model_args(args: &ModelArgs) -> Result<Self> {
        let mut config = Self::load(args.config.as_deref())?;
        config.apply_model_args(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_model_args(&mut self, args: &ModelArgs) {
        if let Some(provider) = args.llm_provider {
            self.provider = provider;
        }
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(max_tokens) = args.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            self.temperature = temperature;
        }
        if let Some(max_attempts) = args.max_attempts {
            self.retry.max_attempts = max_attempts;
        }
        if let Some(min) = args.min_delay_secs {
            self.retry.min_delay_secs = min;
        }
        if let Some(max) = args.max_delay_secs {
            self.retry.max_delay_secs = max;
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.model.trim().is_empty(), "model must not be blank");
        ensure!(self.max_tokens > 0, "max_tokens must be > 0");
        ensure!(
            self.temperature.is_finite(),
            "temperature must be a finite number"
        );
        ensure!(
            self.no_context_pass || self.context_pass,
            "at least one of no_context_pass or context_pass must be enabled"
        );
        self.retry.validate().context("Invalid retry settings")
    }

    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.retry.max_attempts,
            multiplier: self.retry.multiplier,
            min_delay: Duration::from_secs_f64(self.retry.min_delay_secs),
            max_delay: Duration::from_secs_f64(self.retry.max_delay_secs),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            questions_path: self.questions.clone(),
            contexts_path: self.contexts.clone(),
            output_path: self.output.clone(),
            generation: self.generation(),
            no_context_pass: self.no_context_pass,
            context_pass: self.context_pass,
            skip_completed: self.skip_completed,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.max_attempts >= 1, "max_attempts must be >= 1");
        ensure!(
            self.multiplier.is_finite() && self.multiplier >= 0.0,
            "multiplier must be a non-negative number"
        );
        for (name, value) in [
            ("min_delay_secs", self.min_delay_secs),
            ("max_delay_secs", self.max_delay_secs),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "{name} must be a non-negative number"
            );
            ensure!(
                value <= MAX_DELAY_CAP_SECS,
                "{name} ({value}) must not exceed {MAX_DELAY_CAP_SECS} seconds"
            );
        }
        ensure!(
            self.min_delay_secs <= self.max_delay_secs,
            "min_delay_secs ({}) must not exceed max_delay_secs ({})",
            self.min_delay_secs,
            self.max_delay_secs
        );
        Ok(())
    }
}

impl FromStr for SweepConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml_str(s)
    }
}
