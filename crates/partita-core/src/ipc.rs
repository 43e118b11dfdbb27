use partita_domain_layout::ScoreDocument;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    Upload { path: String },
    SelectPart { name: String },
    EditSource { text: String },
    Transpose { delta: i32 },
    ExportDocument,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Uploading,
    Analyzing,
    Ready,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    SessionUpdated {
        phase: SessionPhase,
        error: Option<String>,
    },
    AnalysisReady {
        instruments: Vec<String>,
        tempo: String,
        key_signature: String,
        description: String,
        parts: Vec<String>,
    },
    PartSelected { name: String, source: String },
    TransposeUpdated { semitones: i32 },
    ExportFinished { document: ScoreDocument },
    ExportFailed { message: String },
}
