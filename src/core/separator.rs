use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    core::{
        audio::write_audio,
        chunker,
        dsp::interleave,
        features::FeatureExtractor,
        resynth,
    },
    error::{Result, SeparatorError},
    io::progress::{emit, percent, SeparationProgress},
    model::checkpoint::Checkpoint,
    types::{
        AudioData, LoadOptions, SeparateOptions, SeparatedSource, Separation, SeparationResult,
    },
};

/// Loaded checkpoint plus the feature pipeline it was trained with.
pub struct Separator {
    checkpoint: Checkpoint,
    extractor: FeatureExtractor,
}

impl Separator {
    pub fn load<P: AsRef<Path>>(checkpoint: P, opts: LoadOptions) -> Result<Self> {
        emit(SeparationProgress::Stage("load_checkpoint"));
        let checkpoint = Checkpoint::load(checkpoint, &opts)?;
        Ok(Self::new(checkpoint))
    }

    pub fn new(checkpoint: Checkpoint) -> Self {
        let extractor = FeatureExtractor::new(checkpoint.config().clone());
        Self {
            checkpoint,
            extractor,
        }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Separate a waveform already at the model's sample rate and channel count.
    pub fn separate(&self, audio: &AudioData) -> Result<Separation> {
        let shape = self.checkpoint.chunk_shape();
        if audio.channels as usize != shape.channels {
            return Err(SeparatorError::Inference(format!(
                "waveform has {} channels, model expects {}",
                audio.channels, shape.channels
            )));
        }

        emit(SeparationProgress::Stage("extract"));
        let (spec, features) = self.extractor.extract(audio)?;
        let total = spec.frames();

        emit(SeparationProgress::Stage("chunk"));
        let batch = chunker::chunk(features.view(), &shape)?;
        let chunks = batch.dim().0;
        if chunks == 0 {
            return Err(SeparatorError::Inference(format!(
                "input spans {} frames, shorter than one chunk of {}",
                total, shape.frames
            )));
        }
        let kept = chunker::truncated_frames(total, shape.frames);
        let discarded_frames = total - kept;
        debug!(
            "{} chunks of {} frames, dropping {} trailing frames",
            chunks, shape.frames, discarded_frames
        );

        emit(SeparationProgress::Stage("infer"));
        let output = self.checkpoint.engine().run(batch.view())?;
        emit(SeparationProgress::Chunks {
            done: chunks,
            total: chunks,
            percent: percent(chunks, chunks),
        });

        emit(SeparationProgress::Stage("resynthesize"));
        let separated = resynth::assemble(output.masks.view(), spec.magnitude.view(), &shape)?;

        let mut sources = Vec::with_capacity(self.checkpoint.classes().len());
        for (index, class) in self.checkpoint.classes().iter().enumerate() {
            let magnitude = resynth::select_class(separated.view(), index)?;
            let planar = resynth::invert(self.extractor.stft(), magnitude.view(), spec.phase.view())?;
            sources.push(SeparatedSource {
                class: class.clone(),
                audio: AudioData {
                    samples: interleave(&planar),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                },
            });
        }

        Ok(Separation {
            sources,
            chunks,
            discarded_frames,
            logits: output.logits,
        })
    }

    /// Read `input`, separate it, and write one WAV per requested class.
    pub fn separate_file<P: AsRef<Path>>(
        &self,
        input: P,
        opts: &SeparateOptions,
    ) -> Result<SeparationResult> {
        let input = input.as_ref();
        let wanted = self.resolve_classes(&opts.classes)?;

        emit(SeparationProgress::Stage("read_audio"));
        let audio = self
            .extractor
            .load_audio(input, self.checkpoint.chunk_shape().channels)?;
        info!(
            "separating {} ({:.2}s at {} Hz)",
            input.display(),
            audio.duration_secs(),
            audio.sample_rate
        );

        let separation = self.separate(&audio)?;

        emit(SeparationProgress::Stage("write_stems"));
        let out_dir = self.output_dir(opts);
        let file_stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");

        let mut outputs = Vec::with_capacity(wanted.len());
        for (done, index) in wanted.iter().enumerate() {
            let source = &separation.sources[*index];
            let path = out_dir.join(format!("{file_stem}_{}.wav", source.class));
            write_audio(&path, &source.audio, opts.sample_format)?;
            emit(SeparationProgress::Writing {
                class: source.class.clone(),
                done: done + 1,
                total: wanted.len(),
                percent: percent(done + 1, wanted.len()),
            });
            debug!("wrote {}", path.display());
            outputs.push((source.class.clone(), path));
        }

        emit(SeparationProgress::Finished);
        Ok(SeparationResult {
            outputs,
            chunks: separation.chunks,
            discarded_frames: separation.discarded_frames,
        })
    }

    fn resolve_classes(&self, names: &[String]) -> Result<Vec<usize>> {
        if names.is_empty() {
            return Ok((0..self.checkpoint.classes().len()).collect());
        }
        names.iter().map(|n| self.checkpoint.class_index(n)).collect()
    }

    fn output_dir(&self, opts: &SeparateOptions) -> PathBuf {
        opts.output_dir
            .clone()
            .or_else(|| self.checkpoint.output_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// One-shot convenience: load `checkpoint` and separate `input` with it.
pub fn separate_file(
    checkpoint: &str,
    input: &str,
    opts: SeparateOptions,
) -> Result<SeparationResult> {
    let separator = Separator::load(
        checkpoint,
        LoadOptions {
            output_dir: opts.output_dir.clone(),
        },
    )?;
    separator.separate_file(input, &opts)
}
