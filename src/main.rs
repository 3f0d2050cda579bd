mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use cs_av::{FfprobeProber, ToolRegistry};
use cs_core::config::Config;
use cs_probe::{can_direct_play, find_external_subtitles, Prober};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting cozystream server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    cs_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cozystream=trace,cs_server=trace,cs_stream=trace,cs_av=debug,cs_probe=debug,cs_core=debug,tower_http=debug".to_string()
        } else {
            "cozystream=info,cs_server=info,cs_stream=info,cs_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cozystream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::new(tools.require("ffprobe")?.to_path_buf());

    let probe = prober.probe(file).await?;
    let direct_play = can_direct_play(Some(&probe));
    let sidecars = find_external_subtitles(file);

    if json {
        let value = serde_json::json!({
            "probe": probe,
            "direct_play": direct_play,
            "external_subtitles": sidecars,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Container: {}", probe.container.as_deref().unwrap_or("unknown"));
    if let Some(secs) = probe.duration_seconds {
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let Some(ref codec) = probe.video_codec {
        print!("Video: {codec}");
        if let (Some(w), Some(h)) = (probe.width, probe.height) {
            print!(" {w}x{h}");
        }
        println!();
    }

    println!("\nAudio Tracks: {}", probe.audio_tracks.len());
    for (i, track) in probe.audio_tracks.iter().enumerate() {
        print!("  [{}] #{} {} {}ch", i, track.stream_index, track.codec, track.channels);
        if let Some(ref lang) = track.language {
            print!(" ({lang})");
        }
        println!();
    }

    println!("\nSubtitle Tracks: {}", probe.subtitle_tracks.len());
    for track in &probe.subtitle_tracks {
        print!("  #{} {}", track.stream_index, track.codec);
        if let Some(ref lang) = track.language {
            print!(" ({lang})");
        }
        if track.forced {
            print!(" [forced]");
        }
        if !track.is_text_based() {
            print!(" [bitmap]");
        }
        println!();
    }

    println!("\nExternal Subtitles: {}", sidecars.len());
    for sub in &sidecars {
        print!("  {} [{}]", sub.file_path.display(), sub.format);
        if let Some(ref lang) = sub.language {
            print!(" ({lang})");
        }
        println!();
    }

    println!(
        "\nDirect play: {}",
        if direct_play { "yes" } else { "no (transcode)" }
    );

    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all().await {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable transcoding and probing.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Library roots: {}", config.library.roots.len());
    println!("  Transcode cache: {}", config.transcode.cache_root().display());
    println!(
        "  Segments: {}s, ready after {}",
        config.transcode.segment_duration_secs, config.transcode.min_ready_segments
    );

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
