use clap::{Parser, Subcommand};
use partita_core::{Command as SessionCommand, Event, SessionController, SessionPhase};
use partita_domain_layout::{PageGeometry, PagePlacement, ScoreDocument};
use partita_infra_analysis_gemini::{GeminiAnalysis, GeminiConfig};
use partita_infra_media_fs::FsAudioSource;
use partita_infra_storage_fs::FsStorage;
use partita_infra_surface_abc::{AbcSurface, AbcToolchain};
use partita_ports::storage::{SettingsDto, StoragePort};
use partita_ports::types::SurfaceId;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "partita")]
#[command(about = "Turn an audio recording into editable multi-part sheet music")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Analyze an audio file, optionally tweak the result, and export it.
    Transcribe {
        /// Audio file to analyze (mp3, wav, ogg, flac, ...)
        audio: PathBuf,
        /// Part to select once analysis completes; defaults to 'Full Score'
        /// or the first part the analyzer returns
        #[arg(long)]
        part: Option<String>,
        /// Semitone offset applied at render time, e.g. 2 or -3
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        transpose: i32,
        /// Replace the selected part's notation with this ABC file before
        /// rendering
        #[arg(long, value_name = "FILE")]
        edit_file: Option<PathBuf>,
        /// Directory the exported document lands in
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Print the selected part's notation instead of exporting
        #[arg(long)]
        no_export: bool,
        /// Give up if analysis takes longer than this many seconds
        #[arg(long = "timeout", value_name = "SECS", default_value_t = 300)]
        timeout_secs: u64,
    },
    /// Print the effective settings and where they are stored.
    Settings,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partita_app=info,partita_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        CliCommand::Transcribe {
            audio,
            part,
            transpose,
            edit_file,
            out_dir,
            no_export,
            timeout_secs,
        } => run_transcribe(audio, part, transpose, edit_file, out_dir, no_export, timeout_secs),
        CliCommand::Settings => run_settings(),
    };

    if let Err(message) = result {
        error!(%message, "command failed");
        std::process::exit(1);
    }
}

fn run_transcribe(
    audio: PathBuf,
    part: Option<String>,
    transpose: i32,
    edit_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    no_export: bool,
    timeout_secs: u64,
) -> Result<(), String> {
    let storage = FsStorage::default();
    let settings = match storage.load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "settings unreadable, using defaults");
            SettingsDto::default()
        }
    };

    let mut controller = build_controller(&settings)?;

    info!(file = %audio.display(), "uploading");
    controller
        .handle_command(SessionCommand::Upload {
            path: audio.display().to_string(),
        })
        .map_err(|e| e.to_string())?;
    wait_for_ready(&mut controller, Duration::from_secs(timeout_secs))?;

    if let Some(name) = part {
        controller
            .handle_command(SessionCommand::SelectPart { name })
            .map_err(|e| e.to_string())?;
    }
    if let Some(path) = edit_file {
        let text =
            fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        controller
            .handle_command(SessionCommand::EditSource { text })
            .map_err(|e| e.to_string())?;
    }
    if transpose != 0 {
        controller
            .handle_command(SessionCommand::Transpose { delta: transpose })
            .map_err(|e| e.to_string())?;
    }

    if no_export {
        drain_logs(&mut controller);
        if let Some(session) = controller.session() {
            println!("{}", session.buffer());
        }
        return Ok(());
    }

    // The capture reads surface pixels, so let the last render land first.
    wait_for_render_idle(&mut controller, Duration::from_secs(60))?;
    controller
        .handle_command(SessionCommand::ExportDocument)
        .map_err(|e| e.to_string())?;
    let document = wait_for_document(&mut controller, Duration::from_secs(120))?;

    let out_dir = out_dir
        .or_else(|| settings.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let (png_path, manifest_path) = write_document(&document, &out_dir)?;
    info!(
        pages = document.plan.pages.len(),
        image = %png_path.display(),
        manifest = %manifest_path.display(),
        "export written"
    );
    println!("{}", png_path.display());
    println!("{}", manifest_path.display());
    Ok(())
}

fn run_settings() -> Result<(), String> {
    let storage = FsStorage::default();
    let settings = storage.load_settings().map_err(|e| e.to_string())?;
    let text = serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())?;
    println!("# {}", storage.settings_path().display());
    println!("{text}");
    Ok(())
}

fn build_controller(settings: &SettingsDto) -> Result<SessionController, String> {
    let api_key = env::var("PARTITA_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .or_else(|| settings.api_key.clone())
        .ok_or("API key is missing. Set PARTITA_API_KEY or put api_key in settings.json")?;

    let mut config = GeminiConfig::new(api_key);
    config.model = settings.model.clone();
    if let Some(base_url) = &settings.api_base_url {
        config.base_url = base_url.clone();
    }

    let mut toolchain = AbcToolchain::default();
    if let Some(path) = &settings.abc2abc_path {
        toolchain.abc2abc_path = path.clone();
    }
    if let Some(path) = &settings.abcm2ps_path {
        toolchain.abcm2ps_path = path.clone();
    }
    if let Some(path) = &settings.rsvg_convert_path {
        toolchain.rsvg_convert_path = path.clone();
    }

    let surface_dir = settings
        .surface_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("partita-surfaces"));
    let surface = AbcSurface::new(surface_dir, toolchain);

    let geometry = PageGeometry::new(
        settings.page_content_width_mm,
        settings.page_content_height_mm,
        settings.page_start_offset_mm,
    )
    .map_err(|e| e.to_string())?;

    Ok(SessionController::new(
        Box::new(FsAudioSource::new()),
        Box::new(GeminiAnalysis::new(config)),
        Box::new(surface.clone()),
        Box::new(surface),
        SurfaceId::new("session"),
        geometry,
    ))
}

fn wait_for_ready(controller: &mut SessionController, timeout: Duration) -> Result<(), String> {
    let start = Instant::now();
    loop {
        controller.tick();
        for event in controller.drain_events() {
            log_event(&event);
        }
        match controller.phase() {
            SessionPhase::Ready => return Ok(()),
            SessionPhase::Failed => {
                return Err(controller
                    .error()
                    .unwrap_or("analysis failed")
                    .to_string());
            }
            _ => {}
        }
        if start.elapsed() > timeout {
            return Err("timed out waiting for analysis".to_string());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_for_render_idle(
    controller: &mut SessionController,
    timeout: Duration,
) -> Result<(), String> {
    let start = Instant::now();
    loop {
        controller.tick();
        for event in controller.drain_events() {
            log_event(&event);
        }
        if controller.render_idle() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            return Err("timed out waiting for the renderer".to_string());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_for_document(
    controller: &mut SessionController,
    timeout: Duration,
) -> Result<ScoreDocument, String> {
    let start = Instant::now();
    loop {
        controller.tick();
        for event in controller.drain_events() {
            match event {
                Event::ExportFinished { document } => return Ok(document),
                Event::ExportFailed { message } => return Err(format!("export failed: {message}")),
                other => log_event(&other),
            }
        }
        if start.elapsed() > timeout {
            return Err("timed out waiting for export".to_string());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn drain_logs(controller: &mut SessionController) {
    controller.tick();
    for event in controller.drain_events() {
        log_event(&event);
    }
}

fn log_event(event: &Event) {
    match event {
        Event::SessionUpdated { phase, error } => match error {
            Some(error) => warn!(?phase, %error, "session updated"),
            None => debug!(?phase, "session updated"),
        },
        Event::AnalysisReady {
            instruments,
            tempo,
            key_signature,
            description,
            parts,
        } => {
            info!(tempo = %tempo, key = %key_signature, "analysis ready");
            info!(
                instruments = %instruments.join(", "),
                parts = %parts.join(", "),
                "detected"
            );
            info!(%description, "analyzer notes");
        }
        Event::PartSelected { name, .. } => info!(part = %name, "part selected"),
        Event::TransposeUpdated { semitones } => info!(semitones, "transpose updated"),
        Event::ExportFinished { .. } | Event::ExportFailed { .. } => {}
    }
}

#[derive(Serialize)]
struct DocumentManifest<'a> {
    title: &'a str,
    part: &'a str,
    transpose_semitones: i32,
    image_file: String,
    image_width_px: u32,
    image_height_px: u32,
    image_width_mm: f64,
    image_height_mm: f64,
    geometry: PageGeometry,
    pages: &'a [PagePlacement],
}

fn write_document(
    document: &ScoreDocument,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf), String> {
    fs::create_dir_all(out_dir).map_err(|e| e.to_string())?;

    let stem = document.file_stem();
    let png_path = make_unique_path(out_dir.join(format!("{stem}.png")))?;
    let final_stem = png_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(stem.as_str());
    let manifest_path = make_unique_path(out_dir.join(format!("{final_stem}.pages.json")))?;

    fs::write(&png_path, &document.image.png).map_err(|e| e.to_string())?;

    let manifest = DocumentManifest {
        title: &document.title,
        part: &document.part_name,
        transpose_semitones: document.transpose_semitones,
        image_file: png_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("capture.png")
            .to_string(),
        image_width_px: document.image.width_px,
        image_height_px: document.image.height_px,
        image_width_mm: document.plan.image_width,
        image_height_mm: document.plan.image_height,
        geometry: document.geometry,
        pages: &document.plan.pages,
    };
    let data = serde_json::to_vec_pretty(&manifest).map_err(|e| e.to_string())?;
    fs::write(&manifest_path, data).map_err(|e| e.to_string())?;

    Ok((png_path, manifest_path))
}

fn make_unique_path(path: PathBuf) -> Result<PathBuf, String> {
    if !path.exists() {
        return Ok(path);
    }

    let parent = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");

    for idx in 1..=999 {
        let candidate = parent.join(format!("{stem}-{idx}.{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs();
    Ok(parent.join(format!("{stem}-{now}.{ext}")))
}
