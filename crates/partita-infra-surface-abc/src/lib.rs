use parking_lot::Mutex;
use partita_ports::export::{CaptureCallback, ExportError, ExportPort, RasterImage};
use partita_ports::render::{RenderCallback, RenderError, RenderPort};
use partita_ports::types::SurfaceId;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// External tools the surface shells out to. abc2abc applies the semitone
/// offset, abcm2ps engraves SVG, rsvg-convert rasterizes the capture.
#[derive(Clone, Debug)]
pub struct AbcToolchain {
    pub abc2abc_path: String,
    pub abcm2ps_path: String,
    pub rsvg_convert_path: String,
}

impl Default for AbcToolchain {
    fn default() -> Self {
        Self {
            abc2abc_path: "abc2abc".to_string(),
            abcm2ps_path: "abcm2ps".to_string(),
            rsvg_convert_path: "rsvg-convert".to_string(),
        }
    }
}

/// One directory per surface under `base_dir`; the last engraved SVG per
/// surface is what a capture picks up.
#[derive(Clone)]
pub struct AbcSurface {
    base_dir: PathBuf,
    toolchain: AbcToolchain,
    rendered: Arc<Mutex<HashMap<SurfaceId, PathBuf>>>,
}

impl AbcSurface {
    pub fn new(base_dir: PathBuf, toolchain: AbcToolchain) -> Self {
        Self {
            base_dir,
            toolchain,
            rendered: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn surface_dir(&self, surface: &SurfaceId) -> PathBuf {
        self.base_dir.join(&surface.0)
    }
}

impl RenderPort for AbcSurface {
    fn render(
        &self,
        surface: &SurfaceId,
        source: &str,
        transpose_semitones: i32,
        done: RenderCallback,
    ) {
        let dir = self.surface_dir(surface);
        let toolchain = self.toolchain.clone();
        let rendered = Arc::clone(&self.rendered);
        let surface = surface.clone();
        let source = source.to_string();
        std::thread::spawn(move || {
            let result = engrave(&toolchain, &dir, &source, transpose_semitones).map(|svg| {
                rendered.lock().insert(surface, svg);
            });
            done(result);
        });
    }
}

impl ExportPort for AbcSurface {
    fn capture(&self, surface: &SurfaceId, done: CaptureCallback) {
        let dir = self.surface_dir(surface);
        let svg = self.rendered.lock().get(surface).cloned();
        let toolchain = self.toolchain.clone();
        std::thread::spawn(move || done(rasterize(&toolchain, &dir, svg)));
    }
}

fn engrave(
    toolchain: &AbcToolchain,
    dir: &Path,
    source: &str,
    transpose_semitones: i32,
) -> Result<PathBuf, RenderError> {
    fs::create_dir_all(dir).map_err(|e| RenderError::Io(e.to_string()))?;
    let input = dir.join("input.abc");
    fs::write(&input, source).map_err(|e| RenderError::Io(e.to_string()))?;

    // The offset is applied to a throwaway copy; input.abc stays as
    // submitted.
    let engrave_input = if transpose_semitones != 0 {
        let output = Command::new(&toolchain.abc2abc_path)
            .arg(&input)
            .arg("-t")
            .arg(transpose_semitones.to_string())
            .output()
            .map_err(|e| RenderError::Backend(format!("abc2abc: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(RenderError::Backend(format!("abc2abc failed: {stderr}")));
        }
        let transposed = dir.join("transposed.abc");
        fs::write(&transposed, &output.stdout).map_err(|e| RenderError::Io(e.to_string()))?;
        transposed
    } else {
        input
    };

    let job = format!("engrave-{}", job_stamp());
    let output = Command::new(&toolchain.abcm2ps_path)
        .arg("-g")
        .arg("-O")
        .arg(dir.join(&job))
        .arg(&engrave_input)
        .output()
        .map_err(|e| RenderError::Backend(format!("abcm2ps: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(RenderError::Backend(format!("abcm2ps failed: {stderr}")));
    }

    find_job_svg(dir, &job)
        .ok_or_else(|| RenderError::Backend("abcm2ps produced no svg".to_string()))
}

fn rasterize(
    toolchain: &AbcToolchain,
    dir: &Path,
    svg: Option<PathBuf>,
) -> Result<RasterImage, ExportError> {
    // Only what this process engraved is capturable; the surface directory
    // may hold output from earlier runs.
    let svg = svg
        .filter(|path| path.exists())
        .ok_or_else(|| ExportError::CaptureFailed("nothing rendered on this surface".to_string()))?;

    let png_path = dir.join("capture.png");
    let output = Command::new(&toolchain.rsvg_convert_path)
        .arg("--zoom")
        .arg("2")
        .arg("--background-color")
        .arg("white")
        .arg("-o")
        .arg(&png_path)
        .arg(&svg)
        .output()
        .map_err(|e| ExportError::Backend(format!("rsvg-convert: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ExportError::CaptureFailed(format!("rsvg-convert failed: {stderr}")));
    }

    let png = fs::read(&png_path).map_err(|e| ExportError::Io(e.to_string()))?;
    let (width_px, height_px) = png_dimensions(&png)
        .ok_or_else(|| ExportError::CaptureFailed("capture is not a png".to_string()))?;
    Ok(RasterImage {
        width_px,
        height_px,
        png,
    })
}

fn job_stamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn find_job_svg(dir: &Path, job: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut outputs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(job) && name.ends_with(".svg"))
        })
        .collect();
    outputs.sort();
    // abcm2ps numbers one file per tune; the first is the engraved score.
    outputs.into_iter().next()
}

/// Width and height sit at fixed offsets in the IHDR chunk.
fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    if png.len() < 24 || png[..8] != SIGNATURE || &png[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(png[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(png[20..24].try_into().ok()?);
    (width > 0 && height > 0).then_some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    #[test]
    fn png_dimensions_come_from_the_ihdr_chunk() {
        assert_eq!(png_dimensions(&png_header(1900, 6000)), Some((1900, 6000)));
        assert_eq!(png_dimensions(&png_header(0, 10)), None);
        assert_eq!(png_dimensions(b"not a png at all, honest"), None);
        assert_eq!(png_dimensions(&[]), None);
    }

    #[test]
    fn job_output_lookup_is_scoped_to_its_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("engrave-100001.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("engrave-200001.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("engrave-200002.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("engrave-200.log"), "noise").unwrap();
        fs::write(dir.path().join("input.abc"), "X:1").unwrap();

        assert_eq!(
            find_job_svg(dir.path(), "engrave-200"),
            Some(dir.path().join("engrave-200001.svg"))
        );
        assert_eq!(find_job_svg(dir.path(), "engrave-300"), None);
    }

    #[test]
    fn capture_never_picks_up_files_from_an_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("engrave-11111111001.svg"), "<svg/>").unwrap();

        let err = rasterize(&AbcToolchain::default(), dir.path(), None).unwrap_err();
        assert!(matches!(err, ExportError::CaptureFailed(_)));

        let gone = dir.path().join("engrave-9001.svg");
        let err = rasterize(&AbcToolchain::default(), dir.path(), Some(gone)).unwrap_err();
        assert!(matches!(err, ExportError::CaptureFailed(_)));
    }

    #[test]
    fn surfaces_get_their_own_directories() {
        let surface = AbcSurface::new(PathBuf::from("/tmp/partita"), AbcToolchain::default());
        assert_eq!(
            surface.surface_dir(&SurfaceId::new("main")),
            PathBuf::from("/tmp/partita/main")
        );
    }
}
