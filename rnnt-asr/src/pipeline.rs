//! End-to-end batched transcription pipeline.

use crate::audio::read_waveforms;
use crate::batch::pad_features;
use crate::decode::{DecodingMethod, decode_batch};
use crate::detokenizer::BpeDetokenizer;
use crate::error::Result;
use crate::features::Fbank;
use crate::model::{Decoder, Encoder, Joiner, TransducerModel};
use std::path::PathBuf;

/// One input file's decoded words, in CLI input order.
#[derive(Clone, Debug)]
pub struct Transcript {
    pub file: PathBuf,
    pub words: Vec<String>,
}

/// Batched offline transcriber.
///
/// Owns the three transducer networks, the fbank extractor, and the BPE
/// detokenizer. One call transcribes one batch of files all-or-nothing: any
/// fatal error aborts before a single transcript is produced.
pub struct Transcriber<E, D, J> {
    pub model: TransducerModel<E, D, J>,
    pub fbank: Fbank,
    pub detokenizer: BpeDetokenizer,
}

impl<E: Encoder, D: Decoder, J: Joiner> Transcriber<E, D, J> {
    pub fn new(model: TransducerModel<E, D, J>, fbank: Fbank, detokenizer: BpeDetokenizer) -> Self {
        Self {
            model,
            fbank,
            detokenizer,
        }
    }

    /// Transcribe a list of sound files.
    ///
    /// All waveforms are loaded before feature extraction begins; the batch
    /// goes through a single encoder pass and utterances are then decoded
    /// independently. Output order equals input file order.
    pub fn transcribe_files(
        &mut self,
        files: &[PathBuf],
        method: DecodingMethod,
        beam_size: usize,
    ) -> Result<Vec<Transcript>> {
        tracing::info!(count = files.len(), "reading sound files");
        let expected_rate = self.fbank.config().sample_rate;
        let waveforms = read_waveforms(files, expected_rate)?;

        tracing::info!("decoding started");
        let features: Vec<_> = waveforms.iter().map(|w| self.fbank.compute(w)).collect();
        let batch = pad_features(&features)?;

        let encoder_output = self.model.encoder.forward(&batch)?;

        let hypotheses = decode_batch(
            &mut self.model.decoder,
            &mut self.model.joiner,
            &encoder_output,
            self.model.blank_id,
            method,
            beam_size,
        )?;

        let mut transcripts = Vec::with_capacity(files.len());
        for (file, hyp) in files.iter().zip(hypotheses) {
            let words = self.detokenizer.decode(&hyp)?;
            transcripts.push(Transcript {
                file: file.clone(),
                words,
            });
        }

        tracing::info!("decoding done");
        Ok(transcripts)
    }
}

/// Render transcripts as `<filename>:` / `<words>` blocks.
pub fn format_transcripts(transcripts: &[Transcript]) -> String {
    let mut s = String::from("\n");
    for t in transcripts {
        s.push_str(&format!("{}:\n{}\n\n", t.file.display(), t.words.join(" ")));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::create_test_wav;
    use crate::batch::FeatureBatch;
    use crate::detokenizer::tests::test_tokenizer;
    use crate::features::FbankConfig;
    use crate::model::EncoderOutput;
    use crate::search::tests::{StubDecoder, StubJoiner};
    use ndarray::Array3;

    const VOCAB: usize = 5;
    const SUBSAMPLING: usize = 4;

    /// Encoder stub: records the batch shape it saw and scripts utterance
    /// `i` to argmax symbol `i + 1` on its first frame, blank elsewhere.
    struct ScriptedEncoder {
        seen_shape: Option<Vec<usize>>,
        seen_lengths: Vec<usize>,
    }

    impl Encoder for ScriptedEncoder {
        fn forward(&mut self, batch: &FeatureBatch) -> crate::error::Result<EncoderOutput> {
            self.seen_shape = Some(batch.features.shape().to_vec());
            self.seen_lengths = batch.lengths.clone();

            let lengths: Vec<usize> = batch.lengths.iter().map(|&l| l / SUBSAMPLING).collect();
            let max_len = lengths.iter().copied().max().unwrap_or(0);

            let mut outputs = Array3::zeros((batch.lengths.len(), max_len, VOCAB));
            for i in 0..batch.lengths.len() {
                outputs[[i, 0, i + 1]] = 5.0;
            }

            Ok(EncoderOutput { outputs, lengths })
        }
    }

    fn write_wav(name: &str, secs: f32) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let samples: Vec<f32> = (0..(secs * 16000.0) as usize)
            .map(|i| (i as f32 * 0.05).sin() * 0.3)
            .collect();
        create_test_wav(&path, 16000, 1, &samples).unwrap();
        path
    }

    #[test]
    fn two_files_one_padded_batch_order_preserved() {
        let long = write_wav("rnnt_pipeline_3s.wav", 3.0);
        let short = write_wav("rnnt_pipeline_1_5s.wav", 1.5);

        let fbank = Fbank::new(FbankConfig::default());
        let long_frames = fbank.config().num_frames(48000);
        let short_frames = fbank.config().num_frames(24000);

        let model = TransducerModel {
            encoder: ScriptedEncoder {
                seen_shape: None,
                seen_lengths: Vec::new(),
            },
            decoder: StubDecoder {
                vocab_size: VOCAB,
                steps: 0,
            },
            joiner: StubJoiner,
            blank_id: 0,
        };

        let mut transcriber = Transcriber::new(model, fbank, test_tokenizer());

        let files = vec![long.clone(), short.clone()];
        let transcripts = transcriber
            .transcribe_files(&files, DecodingMethod::GreedySearch, 5)
            .unwrap();

        // The encoder saw one batch padded to the longer utterance
        let shape = transcriber.model.encoder.seen_shape.clone().unwrap();
        assert_eq!(shape, vec![2, long_frames, 80]);
        assert_eq!(
            transcriber.model.encoder.seen_lengths,
            vec![long_frames, short_frames]
        );

        // Output block order matches CLI order, one dispatch per utterance
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0].file, long);
        assert_eq!(transcripts[0].words, vec!["HELLO"]);
        assert_eq!(transcripts[1].file, short);
        assert_eq!(transcripts[1].words, vec!["WOR"]);

        std::fs::remove_file(long).ok();
        std::fs::remove_file(short).ok();
    }

    #[test]
    fn sample_rate_mismatch_aborts_without_output() {
        let good = write_wav("rnnt_pipeline_good.wav", 0.5);
        let bad = std::env::temp_dir().join("rnnt_pipeline_8k.wav");
        create_test_wav(&bad, 8000, 1, &[0.1; 4000]).unwrap();

        let model = TransducerModel {
            encoder: ScriptedEncoder {
                seen_shape: None,
                seen_lengths: Vec::new(),
            },
            decoder: StubDecoder {
                vocab_size: VOCAB,
                steps: 0,
            },
            joiner: StubJoiner,
            blank_id: 0,
        };

        let mut transcriber =
            Transcriber::new(model, Fbank::new(FbankConfig::default()), test_tokenizer());

        let result = transcriber.transcribe_files(
            &[good.clone(), bad.clone()],
            DecodingMethod::GreedySearch,
            5,
        );

        assert!(result.is_err());
        // The encoder never ran: loading aborted before feature extraction
        assert!(transcriber.model.encoder.seen_shape.is_none());

        std::fs::remove_file(good).ok();
        std::fs::remove_file(bad).ok();
    }

    #[test]
    fn formats_output_blocks() {
        let transcripts = vec![
            Transcript {
                file: PathBuf::from("foo.wav"),
                words: vec!["HELLO".into(), "WORLD".into()],
            },
            Transcript {
                file: PathBuf::from("bar.wav"),
                words: vec![],
            },
        ];

        let s = format_transcripts(&transcripts);
        assert_eq!(s, "\nfoo.wav:\nHELLO WORLD\n\nbar.wav:\n\n\n");
    }
}
