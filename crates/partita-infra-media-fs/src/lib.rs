use partita_ports::media::{AudioSourcePort, AudioUpload, MediaCallback, MediaError};
use std::fs;
use std::path::Path;

/// Reads uploads from the local filesystem and infers the MIME type from
/// the extension, the way browsers do for file inputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsAudioSource;

impl FsAudioSource {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSourcePort for FsAudioSource {
    fn read(&self, path: &Path, done: MediaCallback) {
        let path = path.to_path_buf();
        std::thread::spawn(move || done(read_upload(&path)));
    }
}

fn read_upload(path: &Path) -> Result<AudioUpload, MediaError> {
    let mime_type = mime_for_path(path)?.to_string();
    let bytes =
        fs::read(path).map_err(|e| MediaError::Read(format!("{}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(AudioUpload {
        bytes,
        mime_type,
        file_name,
    })
}

fn mime_for_path(path: &Path) -> Result<&'static str, MediaError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| MediaError::UnsupportedFormat(path.display().to_string()))?;
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => Ok("audio/mpeg"),
        "wav" => Ok("audio/wav"),
        "ogg" | "oga" => Ok("audio/ogg"),
        "flac" => Ok("audio/flac"),
        "m4a" => Ok("audio/mp4"),
        "aac" => Ok("audio/aac"),
        "aif" | "aiff" => Ok("audio/aiff"),
        "opus" => Ok("audio/opus"),
        "webm" => Ok("audio/webm"),
        other => Err(MediaError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn common_extensions_map_to_audio_mime_types() {
        assert_eq!(mime_for_path(Path::new("take.mp3")).unwrap(), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("take.WAV")).unwrap(), "audio/wav");
        assert_eq!(mime_for_path(Path::new("take.flac")).unwrap(), "audio/flac");
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(matches!(
            mime_for_path(Path::new("take.pdf")),
            Err(MediaError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            mime_for_path(Path::new("no_extension")),
            Err(MediaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn reads_bytes_and_names_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("riff.wav");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"RIFFdata").unwrap();

        let upload = read_upload(&path).unwrap();
        assert_eq!(upload.bytes, b"RIFFdata");
        assert_eq!(upload.mime_type, "audio/wav");
        assert_eq!(upload.file_name, "riff.wav");
    }

    #[test]
    fn missing_file_reports_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_upload(&dir.path().join("gone.mp3")).unwrap_err();
        assert!(matches!(err, MediaError::Read(_)));
    }
}
