//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "rnnt")]
#[command(about = "Offline transducer speech-to-text and corpus fbank caching")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transcribe sound files with a transducer checkpoint
    Transcribe(crate::transcribe::Args),

    /// Compute and cache fbank features for the corpus partitions
    Fbank(crate::fbank::Args),
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Transcribe(args) => crate::transcribe::execute(args.try_into()?),
        Commands::Fbank(args) => crate::fbank::execute(args.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transcribe_command() {
        let cli = Cli::parse_from([
            "rnnt",
            "transcribe",
            "--checkpoint",
            "exp/checkpoint",
            "--bpe-model",
            "bpe/tokenizer.json",
            "foo.wav",
            "bar.wav",
        ]);

        match &cli.command {
            Commands::Transcribe(args) => {
                assert_eq!(args.checkpoint.to_str(), Some("exp/checkpoint"));
                assert_eq!(args.method, "greedy_search");
                assert_eq!(args.beam_size, 5);
                assert_eq!(args.sound_files.len(), 2);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn parses_beam_search_options() {
        let cli = Cli::parse_from([
            "rnnt",
            "transcribe",
            "--checkpoint",
            "exp/checkpoint",
            "--method",
            "beam_search",
            "--beam-size",
            "8",
            "foo.wav",
        ]);

        match &cli.command {
            Commands::Transcribe(args) => {
                assert_eq!(args.method, "beam_search");
                assert_eq!(args.beam_size, 8);
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn transcribe_requires_sound_files() {
        let result = Cli::try_parse_from(["rnnt", "transcribe", "--checkpoint", "exp/checkpoint"]);
        assert!(result.is_err());
    }

    #[test]
    fn unsupported_method_fails_at_config_build() {
        let cli = Cli::parse_from([
            "rnnt",
            "transcribe",
            "--checkpoint",
            "exp/checkpoint",
            "--method",
            "modified_beam_search",
            "foo.wav",
        ]);

        match cli.command {
            Commands::Transcribe(args) => {
                let config: Result<crate::transcribe::Config, _> = args.try_into();
                assert!(config.is_err());
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn parses_fbank_command() {
        let cli = Cli::parse_from([
            "rnnt",
            "fbank",
            "--manifestpath",
            "data/manifests",
            "--fbankpath",
            "data/fbank",
        ]);

        match &cli.command {
            Commands::Fbank(args) => {
                assert_eq!(args.manifestpath.to_str(), Some("data/manifests"));
                assert_eq!(args.fbankpath.to_str(), Some("data/fbank"));
                assert!(args.bpe_model.is_none());
                assert!(args.dataset.is_none());
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }

    #[test]
    fn fbank_accepts_inert_options() {
        let cli = Cli::parse_from([
            "rnnt",
            "fbank",
            "--bpe-model",
            "bpe/tokenizer.json",
            "--dataset",
            "train",
            "--manifestpath",
            "data/manifests",
            "--fbankpath",
            "data/fbank",
        ]);

        match &cli.command {
            Commands::Fbank(args) => {
                assert!(args.bpe_model.is_some());
                assert_eq!(args.dataset.as_deref(), Some("train"));
            }
            _ => panic!("unexpected command: {:?}", cli.command),
        }
    }
}
