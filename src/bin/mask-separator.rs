use std::path::PathBuf;
use std::process;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mask_separator::{
    set_progress_callback, Checkpoint, LoadOptions, SampleFormat, SeparateOptions,
    SeparationProgress, Separator,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mask-separator")]
#[command(about = "Separate audio sources with a trained spectrogram-mask model", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Separate one audio file into per-class WAV files
    Separate {
        #[arg(short, long)]
        checkpoint: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Class to write (repeatable). Defaults to every class.
        #[arg(long = "class")]
        classes: Vec<String>,

        /// Write 32-bit float WAV instead of 16-bit PCM
        #[arg(long)]
        float: bool,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Show what a checkpoint contains
    Inspect {
        #[arg(short, long)]
        checkpoint: PathBuf,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Separate {
            checkpoint,
            input,
            output,
            classes,
            float,
            quiet,
        } => handle_separate(checkpoint, input, output, classes, float, quiet),
        Commands::Inspect { checkpoint } => handle_inspect(checkpoint),
    };

    if let Err(e) = result {
        error!("{e:#}");
        process::exit(1);
    }
}

fn handle_separate(
    checkpoint: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    classes: Vec<String>,
    float: bool,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    if !quiet {
        setup_progress_callback();
    }

    let separator = Separator::load(
        &checkpoint,
        LoadOptions {
            output_dir: output.clone(),
        },
    )?;

    let opts = SeparateOptions {
        output_dir: output,
        classes,
        sample_format: if float {
            SampleFormat::Float32
        } else {
            SampleFormat::Int16
        },
    };

    let result = separator.separate_file(&input, &opts)?;

    if quiet {
        for (_, path) in &result.outputs {
            println!("{}", path.display());
        }
    } else {
        info!(
            "separated {} chunks ({} trailing frames dropped)",
            result.chunks, result.discarded_frames
        );
        for (class, path) in &result.outputs {
            info!("  {:<12} {}", class, path.display());
        }
    }

    Ok(())
}

fn handle_inspect(checkpoint: PathBuf) -> Result<()> {
    let cp = Checkpoint::load(&checkpoint, &LoadOptions::default())?;
    let cfg = cp.config();
    let shape = cp.chunk_shape();

    println!("name:        {}", cp.name());
    println!("version:     {}", cp.version());
    println!("backend:     {}", cp.model().backend());
    println!("sample rate: {} Hz", cfg.sampling_rate);
    println!(
        "stft:        n_fft={} hop={} win={}",
        cfg.n_fft, cfg.hop_length, cfg.win_length
    );
    println!(
        "features:    {:?}, scaling {:?}",
        cfg.feature_type, cfg.scaling_type
    );
    println!(
        "chunk:       ({}, {}, {}) = {:.2}s",
        shape.channels,
        shape.freq_bins,
        shape.frames,
        shape.frames as f32 / cfg.frames_per_second()
    );
    println!("classes:");
    for (i, class) in cp.classes().iter().enumerate() {
        println!("  {i}: {class}");
    }
    Ok(())
}

fn setup_progress_callback() {
    set_progress_callback(|progress| match progress {
        SeparationProgress::Stage(stage) => {
            let stage_name = match stage {
                "load_checkpoint" => "Loading checkpoint",
                "read_audio" => "Reading audio file",
                "extract" => "Computing features",
                "chunk" => "Chunking",
                "infer" => "Running model",
                "resynthesize" => "Resynthesizing",
                "write_stems" => "Writing stems",
                _ => stage,
            };
            info!("{}", stage_name);
        }
        SeparationProgress::Chunks { done, total, percent } => {
            info!("processed {}/{} chunks ({:.0}%)", done, total, percent);
        }
        SeparationProgress::Writing {
            class,
            done,
            total,
            percent,
        } => {
            info!("wrote {} ({}/{}, {:.0}%)", class, done, total, percent);
        }
        SeparationProgress::Finished => {}
    });
}
