use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lemm_core::{
    chain, load_config, master, mix_stems, read_mono, set_progress_callback, write_audio,
    BackendPreference, Capabilities, Config, PromptAnalyzer, SongPipeline, SongProgress,
    SongRequest, StemName, StemSet,
};

#[derive(Parser)]
#[command(name = "lemm")]
#[command(about = "Multi-clip AI song generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $LEMM_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a full song from a prompt
    Generate {
        #[arg(short, long)]
        prompt: String,

        /// Lyrics text; blank lines separate sections
        #[arg(long, conflicts_with = "lyrics_file")]
        lyrics: Option<String>,

        #[arg(long)]
        lyrics_file: Option<PathBuf>,

        /// Number of clips (defaults to generation.default_clips)
        #[arg(short = 'n', long)]
        clips: Option<usize>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        seed: Option<u64>,

        /// auto, ace-step, musicgen or tone
        #[arg(short, long)]
        backend: Option<BackendPreference>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write every clip's stems
        #[arg(long)]
        export_stems: bool,
    },

    /// Mix stem files, given as name=path
    Mix {
        #[arg(required = true)]
        stems: Vec<String>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Chain clips with crossfades
    Chain {
        #[arg(required = true)]
        clips: Vec<PathBuf>,

        /// Crossfade seconds (defaults to audio.crossfade_duration)
        #[arg(long)]
        crossfade: Option<f32>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Normalize and soft-limit a file
    Master {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the analysis of a prompt as JSON
    Analyze { prompt: String },

    /// Show which backends are installed
    Probe,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let result = load_config(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, config, cli.quiet));

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(command: Commands, config: Config, quiet: bool) -> Result<()> {
    match command {
        Commands::Generate {
            prompt,
            lyrics,
            lyrics_file,
            clips,
            temperature,
            seed,
            backend,
            output,
            export_stems,
        } => {
            let lyrics = match lyrics_file {
                Some(path) => Some(
                    fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read lyrics {:?}", path))?,
                ),
                None => lyrics,
            };
            let mut config = config;
            if let Some(dir) = output {
                config.output.directory = dir;
            }
            config.output.export_stems |= export_stems;

            let mut request =
                SongRequest::new(prompt, clips.unwrap_or(config.generation.default_clips));
            request.lyrics = lyrics;
            request.temperature = temperature.unwrap_or(config.generation.temperature);
            request.seed = seed;

            handle_generate(&config, request, backend, quiet)
        }
        Commands::Mix { stems, output } => handle_mix(&config, &stems, &output, quiet),
        Commands::Chain {
            clips,
            crossfade,
            output,
        } => handle_chain(&config, &clips, crossfade, &output, quiet),
        Commands::Master { input, output } => handle_master(&config, &input, &output, quiet),
        Commands::Analyze { prompt } => {
            let analysis = PromptAnalyzer::new().analyze(&prompt);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Commands::Probe => handle_probe(&config),
    }
}

fn handle_generate(
    config: &Config,
    request: SongRequest,
    backend: Option<BackendPreference>,
    quiet: bool,
) -> Result<()> {
    let capabilities = Capabilities::probe(config);
    let preference = backend.unwrap_or(config.generation.backend);
    let pipeline = SongPipeline::from_config(config, &capabilities, preference)?;

    if !quiet {
        eprintln!("🎵 LEMM Song Generator");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Prompt: {}", request.prompt);
        eprintln!("Clips:  {}", request.clip_count);
        eprintln!("Vocals: {}", if request.has_vocals() { "yes" } else { "no" });
        eprintln!("Output: {}", config.output.directory.display());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!();

        set_progress_callback(|event| match event {
            SongProgress::Stage(stage) => eprintln!("▶ {}", stage),
            SongProgress::ClipDone { index, count } => {
                eprintln!("  ✔ clip {}/{} ready", index + 1, count)
            }
        });
    }

    let song = pipeline.generate_song(&request)?;

    if quiet {
        println!("{}", song.path.display());
        return Ok(());
    }

    eprintln!();
    eprintln!("✅ Song generated successfully!");
    eprintln!();
    eprintln!("  🎧 File:     {}", song.path.display());
    eprintln!("  ⏱  Duration: {:.1}s", song.duration_seconds);
    eprintln!("  📈 Peak:     {:.3}  RMS: {:.3}", song.peak, song.rms);
    eprintln!(
        "  🎼 Analysis: {} / {} / {} BPM / {}",
        song.analysis.genre, song.analysis.mood, song.analysis.tempo, song.analysis.key
    );
    for path in &song.stem_paths {
        eprintln!("  🎚  Stem:     {}", path.display());
    }
    for diagnostic in &song.diagnostics {
        eprintln!("  ⚠️  {:?}", diagnostic);
    }
    Ok(())
}

fn handle_mix(config: &Config, stems: &[String], output: &Path, quiet: bool) -> Result<()> {
    let sample_rate = config.audio.sample_rate;
    let mut set = StemSet::new(sample_rate);
    for arg in stems {
        let Some((name, path)) = arg.split_once('=') else {
            bail!("expected name=path, got '{arg}'");
        };
        let audio = read_mono(path, sample_rate)?;
        set.insert(StemName::parse(name), audio.samples);
    }

    let mixed = mix_stems(&set)?;
    write_audio(output, &mixed)?;

    if !quiet {
        eprintln!("✅ Mixed {} stems into {}", set.len(), output.display());
    }
    Ok(())
}

fn handle_chain(
    config: &Config,
    clips: &[PathBuf],
    crossfade: Option<f32>,
    output: &Path,
    quiet: bool,
) -> Result<()> {
    let sample_rate = config.audio.sample_rate;
    let buffers = clips
        .iter()
        .map(|p| read_mono(p, sample_rate))
        .collect::<Result<Vec<_>>>()?;

    let crossfade = crossfade.unwrap_or(config.audio.crossfade_duration);
    let song = chain(&buffers, crossfade, sample_rate)?;
    write_audio(output, &song)?;

    if !quiet {
        eprintln!(
            "✅ Chained {} clips ({:.1}s) into {}",
            buffers.len(),
            song.duration_seconds(),
            output.display()
        );
    }
    Ok(())
}

fn handle_master(config: &Config, input: &Path, output: &Path, quiet: bool) -> Result<()> {
    let audio = read_mono(input, config.audio.sample_rate)?;
    let mastered = master(&audio);
    write_audio(output, &mastered)?;

    if !quiet {
        eprintln!(
            "✅ Mastered {} (peak {:.3} → {:.3})",
            output.display(),
            audio.peak(),
            mastered.peak()
        );
    }
    Ok(())
}

fn handle_probe(config: &Config) -> Result<()> {
    let caps = Capabilities::probe(config);
    let show = |label: &str, path: &Option<PathBuf>| match path {
        Some(p) => eprintln!("  ✔ {:<10} {}", label, p.display()),
        None => eprintln!("  ✘ {:<10} not found", label),
    };

    eprintln!("📋 Installed Backends");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    show("ace-step", &caps.ace_step);
    show("musicgen", &caps.musicgen);
    show("separator", &caps.separator);
    eprintln!();

    match caps.select_generator(config.generation.backend) {
        Ok((kind, reason)) => eprintln!("Selected backend: {} ({})", kind, reason),
        Err(e) => eprintln!("⚠️  {}", e),
    }
    Ok(())
}
