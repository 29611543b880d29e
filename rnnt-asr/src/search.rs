//! Greedy and beam search over the transducer networks.

use crate::error::Result;
use crate::model::{Decoder, Joiner};
use ndarray::{Array1, ArrayView2};
use ndarray_stats::QuantileExt;

/// One candidate decoded token sequence with its cumulative log-probability.
///
/// Blank is never stored; `tokens` is the final transcript material.
#[derive(Clone, Debug)]
pub struct Hypothesis {
    pub tokens: Vec<u32>,
    pub score: f32,
}

fn log_softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let log_sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
    logits.mapv(|x| x - max - log_sum)
}

/// Greedy transducer search: one arg-max decision per encoder frame.
///
/// Blank advances the time axis only; a non-blank symbol is emitted and
/// advances the decoder. Exactly `T` decisions for `T` encoder frames, so
/// termination is bounded by the encoder length; `T == 0` returns an empty
/// hypothesis without touching the decoder.
pub fn greedy_search<D: Decoder, J: Joiner>(
    decoder: &mut D,
    joiner: &mut J,
    encoder_out: ArrayView2<'_, f32>,
    blank_id: u32,
) -> Result<Vec<u32>> {
    let num_frames = encoder_out.nrows();
    if num_frames == 0 {
        return Ok(Vec::new());
    }

    let mut state = decoder.start_state();
    let (mut decoder_out, mut next_state) = decoder.step(blank_id, &state)?;
    state = next_state;

    let mut tokens = Vec::new();

    for t in 0..num_frames {
        let logits = joiner.join(encoder_out.row(t), decoder_out.view())?;
        let symbol = logits.argmax()? as u32;

        if symbol != blank_id {
            tokens.push(symbol);
            (decoder_out, next_state) = decoder.step(symbol, &state)?;
            state = next_state;
        }
    }

    Ok(tokens)
}

/// Candidate extension produced before decoder states are materialized.
struct Candidate {
    parent: usize,
    token: Option<u32>,
    score: f32,
}

/// Beam search: up to `beam` hypotheses scored by cumulative log-probability.
///
/// At each encoder frame every surviving hypothesis is extended by every
/// symbol; the top `beam` extensions survive, ties broken by insertion
/// order. Decoder states are computed only for survivors, so at most `beam`
/// decoder steps run per frame. The best survivor at time-axis exhaustion
/// is returned.
pub fn beam_search<D: Decoder, J: Joiner>(
    decoder: &mut D,
    joiner: &mut J,
    encoder_out: ArrayView2<'_, f32>,
    blank_id: u32,
    beam: usize,
) -> Result<Hypothesis> {
    let num_frames = encoder_out.nrows();
    if num_frames == 0 {
        return Ok(Hypothesis {
            tokens: Vec::new(),
            score: 0.0,
        });
    }

    let beam = beam.max(1);

    let start_state = decoder.start_state();
    let (start_out, start_state) = decoder.step(blank_id, &start_state)?;

    // Live hypotheses with their decoder context
    let mut hyps = vec![(
        Hypothesis {
            tokens: Vec::new(),
            score: 0.0,
        },
        start_out,
        start_state,
    )];

    for t in 0..num_frames {
        let mut candidates = Vec::with_capacity(hyps.len() * (beam + 1));

        for (i, (hyp, decoder_out, _)) in hyps.iter().enumerate() {
            let logits = joiner.join(encoder_out.row(t), decoder_out.view())?;
            let log_probs = log_softmax(&logits);

            for (symbol, &log_prob) in log_probs.iter().enumerate() {
                let symbol = symbol as u32;
                candidates.push(Candidate {
                    parent: i,
                    token: (symbol != blank_id).then_some(symbol),
                    score: hyp.score + log_prob,
                });
            }
        }

        // Stable sort keeps insertion order on equal scores
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(beam);

        let mut next_hyps = Vec::with_capacity(candidates.len());
        for cand in candidates {
            let (parent_hyp, parent_out, parent_state) = &hyps[cand.parent];

            let mut tokens = parent_hyp.tokens.clone();
            let (decoder_out, state) = match cand.token {
                Some(token) => {
                    tokens.push(token);
                    decoder.step(token, parent_state)?
                }
                None => (parent_out.clone(), parent_state.clone()),
            };

            next_hyps.push((
                Hypothesis {
                    tokens,
                    score: cand.score,
                },
                decoder_out,
                state,
            ));
        }

        hyps = next_hyps;
    }

    // Scores are ordered after the final prune; the front is the best
    let (best, _, _) = hyps.swap_remove(0);
    Ok(best)
}
