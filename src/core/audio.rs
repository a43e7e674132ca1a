use std::{fs, fs::File, path::Path};

use hound::WavWriter;
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use crate::{
    core::dsp::{interleave, match_channels, to_planar},
    error::{Result, SeparatorError},
    types::{AudioData, SampleFormat},
};

/// Decode any symphonia-supported file into interleaved `f32` samples at its native rate.
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path: &Path = path.as_ref();
    let shown = path.display();

    let file: File = File::open(path).map_err(|e| SeparatorError::io(&shown, e))?;

    let mss: MediaSourceStream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint: Hint = Hint::new();

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SeparatorError::io(&shown, e))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| SeparatorError::io(&shown, "no default track found"))?;
    let track_id = track.id;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SeparatorError::io(&shown, e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels: u16 = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(SeparatorError::io(&shown, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("skipping undecodable packet in {}: {}", shown, msg);
                continue;
            }
            Err(e) => return Err(SeparatorError::io(&shown, e)),
        };
        sample_rate = decoded.spec().rate;
        channels = decoded.spec().channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);

        samples.extend_from_slice(buffer.samples());
    }

    if sample_rate == 0 || channels == 0 {
        return Err(SeparatorError::io(&shown, "stream has no sample rate or channels"));
    }

    debug!(
        "read audio {}: sample_rate={}, channels={}, samples={}",
        shown,
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

/// Read `path`, resample to `target_rate` and convert to `channels` channels.
pub fn load_audio<P: AsRef<Path>>(path: P, target_rate: u32, channels: usize) -> Result<AudioData> {
    let audio = read_audio(path.as_ref())?;
    let planar = to_planar(&audio.samples, audio.channels);
    let planar = match_channels(planar, channels);
    let planar = resample(planar, audio.sample_rate, target_rate)?;

    Ok(AudioData {
        samples: interleave(&planar),
        sample_rate: target_rate,
        channels: channels as u16,
    })
}

/// Band-limited resampling of a planar signal. A no-op when the rates match.
pub fn resample(planar: Vec<Vec<f32>>, from_sr: u32, to_sr: u32) -> Result<Vec<Vec<f32>>> {
    let frames = planar.first().map(Vec::len).unwrap_or(0);
    if from_sr == to_sr || frames == 0 {
        return Ok(planar);
    }

    let params = InterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: InterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_sr as f64 / from_sr as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, planar.len())
        .map_err(|e| anyhow::anyhow!("resampler setup failed: {e}"))?;
    let mut output = resampler
        .process(&planar, None)
        .map_err(|e| anyhow::anyhow!("resampling {from_sr} Hz -> {to_sr} Hz failed: {e}"))?;

    let expected = (frames as f64 * ratio).round() as usize;
    for ch in &mut output {
        ch.resize(expected, 0.0);
    }

    debug!("resampled {} frames {} Hz -> {} Hz", frames, from_sr, to_sr);
    Ok(output)
}

/// Write a WAV file at the waveform's own sample rate. Parent directories are created.
pub fn write_audio<P: AsRef<Path>>(path: P, audio: &AudioData, format: SampleFormat) -> Result<()> {
    let path = path.as_ref();
    let shown = path.display();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SeparatorError::io(&shown, e))?;
    }

    let spec = match format {
        SampleFormat::Int16 => hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
        SampleFormat::Float32 => hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| SeparatorError::io(&shown, e))?;
    for &sample in &audio.samples {
        let written = match format {
            SampleFormat::Int16 => {
                let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(s)
            }
            SampleFormat::Float32 => writer.write_sample(sample),
        };
        written.map_err(|e| SeparatorError::io(&shown, e))?;
    }

    writer.finalize().map_err(|e| SeparatorError::io(&shown, e))?;
    Ok(())
}
