use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "spindle: local text generation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run inference with a model
    Run(RunArgs),

    /// Download a model from the Hugging Face Hub
    Download {
        /// Hugging Face repo id (org/repo)
        #[arg(short, long)]
        model: String,

        /// Re-download even if cached
        #[arg(long)]
        force: bool,

        /// Hugging Face access token for private or gated models
        #[arg(long)]
        token: Option<String>,
    },

    /// List cached models
    List,

    /// Delete a cached model
    Delete {
        /// Repo id of the model to delete
        #[arg(short, long)]
        model: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate with the built-in mock model (no download required)
    Mock(MockArgs),
}

#[derive(Args, Debug, PartialEq)]
pub struct RunArgs {
    /// Model path or Hugging Face repo id (org/repo)
    #[arg(short, long)]
    pub model: String,

    /// The prompt (or file path, or stdin if not provided)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Maximum new tokens to generate
    #[arg(long, default_value_t = 256)]
    pub max_tokens: usize,

    /// Sampling temperature (below 0.01 = greedy)
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Top-p (nucleus) sampling threshold
    #[arg(long, default_value_t = 0.9)]
    pub top_p: f32,

    /// Top-k sampling (0 disables)
    #[arg(long, default_value_t = 50)]
    pub top_k: usize,

    /// Random seed for reproducibility (negative = random)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub seed: i64,

    /// Stop once the output contains this string
    #[arg(long, value_parser = parse_stop_sequence)]
    pub stop: Option<String>,

    /// Use greedy decoding (ignores temperature)
    #[arg(long)]
    pub greedy: bool,

    /// Print tokens as they are generated
    #[arg(long)]
    pub stream: bool,

    /// Hugging Face access token for private or gated models
    #[arg(long)]
    pub token: Option<String>,

    /// Re-download even if cached
    #[arg(long)]
    pub force_download: bool,

    /// Suppress status messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug, PartialEq)]
pub struct MockArgs {
    /// The prompt (or file path, or stdin if not provided)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Vocabulary size of the mock model
    #[arg(long, default_value_t = 1000, value_parser = parse_positive)]
    pub vocab_size: usize,

    /// Context window of the mock model
    #[arg(long, default_value_t = 512, value_parser = parse_positive)]
    pub context_length: usize,

    /// Maximum new tokens to generate
    #[arg(long, default_value_t = 64)]
    pub max_tokens: usize,

    /// Sampling temperature (below 0.01 = greedy)
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Random seed for both the mock logits and the sampler (negative = random)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub seed: i64,

    /// Print tokens as they are generated
    #[arg(long)]
    pub stream: bool,

    /// Suppress status messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Convert verbosity count to log level string
pub fn verbosity_to_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Parses a count that must be at least 1.
pub fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// An empty stop sequence would match before the first token.
pub fn parse_stop_sequence(value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err("stop sequence must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

/// Sampling is on unless greedy was requested or the temperature is effectively zero.
pub fn sampling_enabled(temperature: f32, greedy: bool) -> bool {
    !greedy && temperature > 0.01
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut full_args = vec!["spindle"];
        full_args.extend(args);
        Cli::try_parse_from(full_args)
    }

    #[test]
    fn test_verbosity_to_log_level() {
        assert_eq!(verbosity_to_log_level(0), "warn");
        assert_eq!(verbosity_to_log_level(1), "info");
        assert_eq!(verbosity_to_log_level(2), "debug");
        assert_eq!(verbosity_to_log_level(3), "trace");
        assert_eq!(verbosity_to_log_level(10), "trace");
    }

    #[test]
    fn test_sampling_enabled() {
        assert!(sampling_enabled(0.7, false));
        assert!(!sampling_enabled(0.7, true));
        assert!(!sampling_enabled(0.0, false));
        assert!(!sampling_enabled(0.01, false));
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse_args(&["run", "-m", "openai-community/gpt2", "-p", "Hello"]).unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.model, "openai-community/gpt2");
                assert_eq!(args.prompt.as_deref(), Some("Hello"));
                assert_eq!(args.max_tokens, 256);
                assert_eq!(args.temperature, 0.7);
                assert_eq!(args.top_p, 0.9);
                assert_eq!(args.top_k, 50);
                assert_eq!(args.seed, -1);
                assert_eq!(args.stop, None);
                assert!(!args.greedy);
                assert!(!args.stream);
                assert!(!args.force_download);
                assert!(args.token.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_all_options() {
        let cli = parse_args(&[
            "run",
            "--model",
            "./models/tiny",
            "--prompt",
            "Once upon a time",
            "--max-tokens",
            "32",
            "--temperature",
            "0.2",
            "--top-p",
            "0.5",
            "--top-k",
            "0",
            "--seed",
            "42",
            "--stop",
            "END",
            "--greedy",
            "--stream",
            "--token",
            "hf_abc",
            "--force-download",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.max_tokens, 32);
                assert_eq!(args.temperature, 0.2);
                assert_eq!(args.top_p, 0.5);
                assert_eq!(args.top_k, 0);
                assert_eq!(args.seed, 42);
                assert_eq!(args.stop.as_deref(), Some("END"));
                assert!(args.greedy);
                assert!(args.stream);
                assert_eq!(args.token.as_deref(), Some("hf_abc"));
                assert!(args.force_download);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_negative_seed() {
        let cli = parse_args(&["run", "-m", "a/b", "--seed", "-7"]).unwrap();
        match cli.command {
            Commands::Run(args) => assert_eq!(args.seed, -7),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_requires_model() {
        assert!(parse_args(&["run", "-p", "hi"]).is_err());
    }

    #[test]
    fn test_download() {
        let cli = parse_args(&["download", "-m", "org/repo", "--force"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Download {
                model: "org/repo".to_string(),
                force: true,
                token: None,
            }
        );
    }

    #[test]
    fn test_list_and_delete() {
        assert_eq!(parse_args(&["list"]).unwrap().command, Commands::List);

        let cli = parse_args(&["delete", "-m", "org/repo", "-y"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Delete {
                model: "org/repo".to_string(),
                yes: true,
            }
        );
    }

    #[test]
    fn test_mock_defaults() {
        let cli = parse_args(&["mock", "-p", "hi"]).unwrap();
        match cli.command {
            Commands::Mock(args) => {
                assert_eq!(args.vocab_size, 1000);
                assert_eq!(args.context_length, 512);
                assert_eq!(args.max_tokens, 64);
                assert_eq!(args.seed, -1);
                assert!(!args.stream);
            }
            _ => panic!("Expected Mock command"),
        }
    }

    #[test]
    fn test_mock_rejects_empty_model() {
        assert!(parse_args(&["mock", "-p", "hi", "--vocab-size", "0"]).is_err());
        assert!(parse_args(&["mock", "-p", "hi", "--context-length", "0"]).is_err());
        assert!(parse_args(&["mock", "-p", "hi", "--vocab-size", "abc"]).is_err());

        match parse_args(&["mock", "-p", "hi", "--vocab-size", "1"]).unwrap().command {
            Commands::Mock(args) => assert_eq!(args.vocab_size, 1),
            _ => panic!("Expected Mock command"),
        }
    }

    #[test]
    fn test_run_rejects_empty_stop() {
        assert!(parse_args(&["run", "-m", "a/b", "--stop", ""]).is_err());
        assert!(parse_args(&["run", "-m", "a/b", "--stop", "\n"]).is_ok());
    }

    #[test]
    fn test_global_verbose() {
        let cli = parse_args(&["list", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
