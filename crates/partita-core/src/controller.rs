use crate::ipc::{Command, Event, SessionPhase};
use crate::session::EditSession;
use partita_domain_layout::{paginate, PageGeometry, ScoreDocument};
use partita_domain_notation::PartBook;
use partita_ports::analysis::{AnalysisError, AnalysisPort, AnalysisResult};
use partita_ports::export::{ExportError, ExportPort, RasterImage};
use partita_ports::media::{AudioSourcePort, AudioUpload, MediaError};
use partita_ports::render::{RenderError, RenderPort};
use partita_ports::types::SurfaceId;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("{op} not available while {phase:?}")]
    Phase { op: &'static str, phase: SessionPhase },
    #[error("unknown part: {0}")]
    UnknownPart(String),
    #[error("an export is already running")]
    ExportBusy,
}

/// Outcome of an async port call, funneled back to the controller thread.
enum Completion {
    Upload {
        generation: u64,
        result: Result<AudioUpload, MediaError>,
    },
    Analysis {
        generation: u64,
        result: Result<AnalysisResult, AnalysisError>,
    },
    Render {
        result: Result<(), RenderError>,
    },
    Capture {
        generation: u64,
        part_name: String,
        semitones: i32,
        result: Result<RasterImage, ExportError>,
    },
}

struct RenderRequest {
    source: String,
    semitones: i32,
}

pub struct SessionController {
    media: Box<dyn AudioSourcePort>,
    analysis: Box<dyn AnalysisPort>,
    render: Box<dyn RenderPort>,
    export: Box<dyn ExportPort>,
    surface: SurfaceId,
    geometry: PageGeometry,
    phase: SessionPhase,
    error: Option<String>,
    result: Option<AnalysisResult>,
    book: Option<PartBook>,
    session: Option<EditSession>,
    // Bumped on upload and reset; completions carrying an older value are
    // dropped on arrival.
    generation: u64,
    render_busy: bool,
    pending_render: Option<RenderRequest>,
    export_busy: bool,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    events: VecDeque<Event>,
}

impl SessionController {
    pub fn new(
        media: Box<dyn AudioSourcePort>,
        analysis: Box<dyn AnalysisPort>,
        render: Box<dyn RenderPort>,
        export: Box<dyn ExportPort>,
        surface: SurfaceId,
        geometry: PageGeometry,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            media,
            analysis,
            render,
            export,
            surface,
            geometry,
            phase: SessionPhase::Idle,
            error: None,
            result: None,
            book: None,
            session: None,
            generation: 0,
            render_busy: false,
            pending_render: None,
            export_busy: false,
            completion_tx,
            completion_rx,
            events: VecDeque::new(),
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), SessionError> {
        match cmd {
            Command::Upload { path } => {
                self.start_upload(PathBuf::from(path));
                Ok(())
            }
            Command::SelectPart { name } => self.select_part(&name),
            Command::EditSource { text } => self.edit_source(text),
            Command::Transpose { delta } => self.transpose(delta),
            Command::ExportDocument => self.start_export(),
            Command::Reset => self.reset(),
        }
    }

    /// Apply completions queued by port callbacks since the last call.
    pub fn tick(&mut self) {
        loop {
            match self.completion_rx.try_recv() {
                Ok(completion) => self.apply_completion(completion),
                Err(_) => break,
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn book(&self) -> Option<&PartBook> {
        self.book.as_ref()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// True when no render is running and none is queued behind it.
    pub fn render_idle(&self) -> bool {
        !self.render_busy && self.pending_render.is_none()
    }

    // Allowed from any phase; whatever was in flight is superseded by the
    // generation bump.
    fn start_upload(&mut self, path: PathBuf) {
        self.generation += 1;
        self.result = None;
        self.book = None;
        self.session = None;
        self.error = None;
        self.pending_render = None;
        self.set_phase(SessionPhase::Uploading);

        let generation = self.generation;
        let tx = self.completion_tx.clone();
        self.media.read(
            &path,
            Box::new(move |result| {
                let _ = tx.send(Completion::Upload { generation, result });
            }),
        );
    }

    fn start_analysis(&mut self, upload: AudioUpload) {
        self.set_phase(SessionPhase::Analyzing);

        let generation = self.generation;
        let tx = self.completion_tx.clone();
        self.analysis.analyze(
            upload,
            Box::new(move |result| {
                let _ = tx.send(Completion::Analysis { generation, result });
            }),
        );
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Upload { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(generation, current = self.generation, "dropping stale upload");
                    return;
                }
                match result {
                    Ok(upload) => self.start_analysis(upload),
                    Err(err) => self.fail(err.to_string()),
                }
            }
            Completion::Analysis { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "dropping stale analysis"
                    );
                    return;
                }
                match result {
                    Ok(result) => self.apply_analysis(result),
                    Err(err) => self.fail(err.to_string()),
                }
            }
            Completion::Render { result } => {
                self.render_busy = false;
                if let Err(err) = result {
                    // Render failures leave the session editable; the surface
                    // just keeps its previous pixels.
                    tracing::warn!(error = %err, "render failed");
                }
                if let Some(request) = self.pending_render.take() {
                    self.issue_render(request);
                }
            }
            Completion::Capture {
                generation,
                part_name,
                semitones,
                result,
            } => {
                self.export_busy = false;
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "dropping stale capture"
                    );
                    return;
                }
                match result {
                    Ok(image) => self.finish_export(part_name, semitones, image),
                    Err(err) => self.events.push_back(Event::ExportFailed {
                        message: err.to_string(),
                    }),
                }
            }
        }
    }

    fn apply_analysis(&mut self, result: AnalysisResult) {
        let book = match PartBook::new(result.parts.clone()) {
            Ok(book) => book,
            Err(err) => {
                self.fail(err.to_string());
                return;
            }
        };
        let session = EditSession::open(&book);

        self.events.push_back(Event::AnalysisReady {
            instruments: result.instruments.clone(),
            tempo: result.tempo.clone(),
            key_signature: result.key_signature.clone(),
            description: result.description.clone(),
            parts: book.names().map(str::to_string).collect(),
        });
        self.events.push_back(Event::PartSelected {
            name: session.part().to_string(),
            source: session.buffer().to_string(),
        });

        self.result = Some(result);
        self.book = Some(book);
        self.session = Some(session);
        self.set_phase(SessionPhase::Ready);
        self.request_render();
    }

    fn select_part(&mut self, name: &str) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::Phase { op: "select part", phase: self.phase });
        }
        let (Some(book), Some(session)) = (self.book.as_ref(), self.session.as_mut()) else {
            return Err(SessionError::Phase { op: "select part", phase: self.phase });
        };
        session
            .select(book, name)
            .map_err(|_| SessionError::UnknownPart(name.to_string()))?;
        let selected = session.part().to_string();
        let source = session.buffer().to_string();

        self.events.push_back(Event::PartSelected { name: selected, source });
        self.request_render();
        Ok(())
    }

    fn edit_source(&mut self, text: String) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::Phase { op: "edit", phase: self.phase });
        }
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::Phase { op: "edit", phase: self.phase });
        };
        session.edit(text);
        self.request_render();
        Ok(())
    }

    fn transpose(&mut self, delta: i32) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::Phase { op: "transpose", phase: self.phase });
        }
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::Phase { op: "transpose", phase: self.phase });
        };
        let semitones = session.transpose_by(delta);

        self.events.push_back(Event::TransposeUpdated {
            semitones: semitones.get(),
        });
        self.request_render();
        Ok(())
    }

    // Last write wins: at most one render runs, at most one waits, and a
    // newer request replaces the waiting one.
    fn request_render(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let request = RenderRequest {
            source: session.buffer().to_string(),
            semitones: session.transpose().get(),
        };
        if self.render_busy {
            self.pending_render = Some(request);
        } else {
            self.issue_render(request);
        }
    }

    fn issue_render(&mut self, request: RenderRequest) {
        self.render_busy = true;
        let tx = self.completion_tx.clone();
        self.render.render(
            &self.surface,
            &request.source,
            request.semitones,
            Box::new(move |result| {
                let _ = tx.send(Completion::Render { result });
            }),
        );
    }

    fn start_export(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(SessionError::Phase { op: "export", phase: self.phase });
        }
        if self.export_busy {
            return Err(SessionError::ExportBusy);
        }
        let Some(session) = self.session.as_ref() else {
            return Err(SessionError::Phase { op: "export", phase: self.phase });
        };
        // The document is labeled with the selection at capture start, not
        // at completion.
        let part_name = session.part().to_string();
        let semitones = session.transpose().get();
        self.export_busy = true;

        let generation = self.generation;
        let tx = self.completion_tx.clone();
        self.export.capture(
            &self.surface,
            Box::new(move |result| {
                let _ = tx.send(Completion::Capture {
                    generation,
                    part_name,
                    semitones,
                    result,
                });
            }),
        );
        Ok(())
    }

    fn finish_export(&mut self, part_name: String, semitones: i32, image: RasterImage) {
        let plan = match paginate(image.width_px, image.height_px, &self.geometry) {
            Ok(plan) => plan,
            Err(err) => {
                self.events.push_back(Event::ExportFailed {
                    message: err.to_string(),
                });
                return;
            }
        };

        let document = ScoreDocument::new(part_name, semitones, self.geometry, image, plan);
        self.events.push_back(Event::ExportFinished { document });
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Ready | SessionPhase::Failed => {
                self.generation += 1;
                self.result = None;
                self.book = None;
                self.session = None;
                self.error = None;
                self.pending_render = None;
                self.set_phase(SessionPhase::Idle);
                Ok(())
            }
            phase => Err(SessionError::Phase { op: "reset", phase }),
        }
    }

    fn fail(&mut self, message: String) {
        self.result = None;
        self.book = None;
        self.session = None;
        self.pending_render = None;
        self.error = Some(message);
        self.set_phase(SessionPhase::Failed);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.events.push_back(Event::SessionUpdated {
            phase,
            error: self.error.clone(),
        });
    }
}
