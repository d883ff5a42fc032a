mod cli;

use mp4read::config::{self, Config};
use mp4read_core::{SampleInfo, TrackSelection, VideoReader};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mp4read=trace,mp4read_core=trace,mp4read_container=trace".to_string()
        } else {
            "mp4read=info,mp4read_core=info,mp4read_container=warn".to_string()
        }
    });

    // stdout carries sample listings
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tracks { file } => list_tracks(&file),
        Commands::Info { file, track, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            show_info(&file, track, json, &config)
        }
        Commands::Samples {
            file,
            track,
            limit,
            json,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            list_samples(&file, track, limit, json, &config)
        }
        Commands::Seek {
            file,
            timestamp,
            track,
            force,
            count,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            seek(&file, timestamp, track, force, count, &config)
        }
        Commands::Dump {
            file,
            output,
            track,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            dump(&file, &output, track, &config)
        }
        Commands::Version => {
            println!("mp4read {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Open `file`, select the requested (or configured) track and initialize it.
fn open_reader(
    file: &Path,
    track: Option<u32>,
    config: &Config,
) -> Result<VideoReader<BufReader<File>>> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let mut reader = VideoReader::open_with_options(file, config.reader.options())
        .with_context(|| format!("Failed to open {:?}", file))?;

    if let Some(id) = track.or(config.reader.track) {
        reader.select_track(TrackSelection::Id(id))?;
    }

    reader
        .initialize()
        .with_context(|| format!("Failed to initialize track {}", reader.track_id()))?;

    Ok(reader)
}

fn list_tracks(file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let mut reader = BufReader::new(File::open(file)?);
    let info = mp4read_container::probe(&mut reader)
        .with_context(|| format!("Failed to probe {:?}", file))?;

    println!("File: {}", file.display());
    println!("Fast start: {}", if info.has_faststart { "yes" } else { "no" });
    println!("\nTracks: {}", info.tracks.len());
    for track in &info.tracks {
        print!(
            "  [{}] {:?} {} samples, {:.3}s",
            track.track_id,
            track.handler_type,
            track.samples.len(),
            track.duration_secs()
        );
        if let Some(avc) = track.avc {
            print!(" (H.264 {}x{})", avc.width, avc.height);
        }
        println!();
    }

    Ok(())
}

#[derive(Serialize)]
struct InfoReport {
    #[serde(flatten)]
    video: mp4read_core::VideoInfo,
    duration_secs: f64,
    start_time_offset: i64,
    keyframes: Option<usize>,
    parameter_sets: usize,
}

fn show_info(file: &Path, track: Option<u32>, json: bool, config: &Config) -> Result<()> {
    let reader = open_reader(file, track, config)?;
    let video = reader.video_info();
    let report = InfoReport {
        video,
        duration_secs: reader.time_duration().as_secs_f64(),
        start_time_offset: reader.start_time_offset().unwrap_or(0),
        keyframes: reader.keyframes().map(<[u32]>::len),
        parameter_sets: reader.codec_configuration().len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Track: {}", video.track_id);
    println!("Video: H.264 {}x{}", video.width, video.height);
    println!("Timescale: {}", video.timescale);
    println!("Duration: {} ({:.3}s)", video.duration, report.duration_secs);
    println!("Samples: {}", video.samples);
    match report.keyframes {
        Some(n) => println!("Keyframes: {}", n),
        None => println!("Keyframes: no sync sample table"),
    }
    println!("Parameter sets: {}", report.parameter_sets);
    println!("Start time offset: {}", report.start_time_offset);

    Ok(())
}

fn list_samples(
    file: &Path,
    track: Option<u32>,
    limit: Option<usize>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let mut reader = open_reader(file, track, config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut count = 0usize;
    for sample in reader.samples().take(limit.unwrap_or(usize::MAX)) {
        let sample = sample?;
        print_sample(&mut out, &sample, json)?;
        count += 1;
    }
    tracing::debug!("Listed {} samples", count);

    Ok(())
}

fn print_sample<W: Write>(out: &mut W, sample: &SampleInfo, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(sample)?)?;
    } else {
        writeln!(
            out,
            "#{:<6} offset={:<10} size={:<8} duration={:<6} pts={}",
            sample.number, sample.offset, sample.size, sample.time_delta, sample.composition_time
        )?;
    }
    Ok(())
}

fn seek(
    file: &Path,
    timestamp: i64,
    track: Option<u32>,
    force: bool,
    count: usize,
    config: &Config,
) -> Result<()> {
    let mut reader = open_reader(file, track, config)?;

    let moved = reader
        .seek(timestamp, force)
        .with_context(|| format!("Failed to seek to {}", timestamp))?;
    println!("Seek to {}: {}", timestamp, if moved { "moved" } else { "unchanged" });

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for sample in reader.samples().take(count) {
        print_sample(&mut out, &sample?, false)?;
    }

    Ok(())
}

fn dump(file: &Path, output: &Path, track: Option<u32>, config: &Config) -> Result<()> {
    let mut reader = open_reader(file, track, config)?;
    let length_size = reader
        .track()
        .avc
        .and_then(|avc| avc.length_size)
        .context("Track has no NAL length size")?;

    let out_file =
        File::create(output).with_context(|| format!("Failed to create {:?}", output))?;
    let mut out = BufWriter::new(out_file);

    mp4read_core::annexb::write_parameter_sets(&mut out, reader.codec_configuration())?;

    let mut buf = Vec::new();
    let mut samples = 0usize;
    let mut nal_units = 0usize;
    loop {
        let sample = match reader.next_sample() {
            Ok(sample) => sample,
            Err(e) if e.is_end_of_stream() => break,
            Err(e) => return Err(e.into()),
        };
        let data = reader.read_sample_data(&sample, &mut buf)?;
        nal_units += mp4read_core::annexb::write_access_unit(&mut out, data, length_size)
            .with_context(|| format!("Malformed sample #{}", sample.number))?;
        samples += 1;
    }
    out.flush()?;

    tracing::info!("Wrote {} samples ({} NAL units) to {:?}", samples, nal_units, output);
    println!("Wrote {} samples to {}", samples, output.display());

    Ok(())
}
