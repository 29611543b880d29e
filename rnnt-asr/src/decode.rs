//! Decoding method selection and per-utterance dispatch.

use crate::error::{ConfigError, Result};
use crate::model::{Decoder, EncoderOutput, Joiner};
use crate::search::{beam_search, greedy_search};
use ndarray::s;
use std::str::FromStr;

/// Decoding strategy selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodingMethod {
    GreedySearch,
    BeamSearch,
}

impl FromStr for DecodingMethod {
    type Err = ConfigError;

    /// Any name other than the two supported ones is a fatal configuration
    /// error; there is no fallback to a default method.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "greedy_search" => Ok(DecodingMethod::GreedySearch),
            "beam_search" => Ok(DecodingMethod::BeamSearch),
            other => Err(ConfigError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for DecodingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodingMethod::GreedySearch => write!(f, "greedy_search"),
            DecodingMethod::BeamSearch => write!(f, "beam_search"),
        }
    }
}

/// Decode every utterance of an encoder pass.
///
/// Each utterance is sliced to its reduced valid length and decoded
/// independently; no state is carried across utterances and the result
/// order equals the batch order.
pub fn decode_batch<D: Decoder, J: Joiner>(
    decoder: &mut D,
    joiner: &mut J,
    encoder_output: &EncoderOutput,
    blank_id: u32,
    method: DecodingMethod,
    beam_size: usize,
) -> Result<Vec<Vec<u32>>> {
    encoder_output
        .lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| {
            let utterance = encoder_output.outputs.slice(s![i, 0..len, ..]);
            match method {
                DecodingMethod::GreedySearch => {
                    greedy_search(decoder, joiner, utterance, blank_id)
                }
                DecodingMethod::BeamSearch => {
                    beam_search(decoder, joiner, utterance, blank_id, beam_size)
                        .map(|hyp| hyp.tokens)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::{StubDecoder, StubJoiner};
    use ndarray::Array3;

    #[test]
    fn parses_supported_methods() {
        assert_eq!(
            "greedy_search".parse::<DecodingMethod>().unwrap(),
            DecodingMethod::GreedySearch
        );
        assert_eq!(
            "beam_search".parse::<DecodingMethod>().unwrap(),
            DecodingMethod::BeamSearch
        );
    }

    #[test]
    fn unsupported_method_never_falls_back() {
        for name in ["fast_beam_search", "greedy", "", "GREEDY_SEARCH"] {
            let result = name.parse::<DecodingMethod>();
            assert!(
                matches!(result, Err(ConfigError::UnsupportedMethod(_))),
                "{name:?} must be rejected"
            );
        }
    }

    #[test]
    fn decodes_each_utterance_to_its_valid_length() {
        let vocab = 6;
        let mut outputs = Array3::zeros((2, 4, vocab));
        // Utterance 0 argmaxes to [2, blank]; frames beyond its length carry
        // a loud symbol that must never be decoded.
        outputs[[0, 0, 2]] = 5.0;
        outputs[[0, 2, 3]] = 9.0;
        outputs[[0, 3, 3]] = 9.0;
        // Utterance 1 argmaxes to [blank, 4, 1, blank]
        outputs[[1, 1, 4]] = 5.0;
        outputs[[1, 2, 1]] = 5.0;

        let encoder_output = EncoderOutput {
            outputs,
            lengths: vec![2, 4],
        };

        let mut decoder = StubDecoder {
            vocab_size: vocab,
            steps: 0,
        };
        let mut joiner = StubJoiner;

        let hyps = decode_batch(
            &mut decoder,
            &mut joiner,
            &encoder_output,
            0,
            DecodingMethod::GreedySearch,
            5,
        )
        .unwrap();

        assert_eq!(hyps.len(), 2);
        assert_eq!(hyps[0], vec![2]);
        assert_eq!(hyps[1], vec![4, 1]);
    }
}
