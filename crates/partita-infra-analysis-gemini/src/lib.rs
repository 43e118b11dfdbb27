use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use partita_ports::analysis::{
    AnalysisCallback, AnalysisError, AnalysisPort, AnalysisResult, PartSource,
};
use partita_ports::media::AudioUpload;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

const SYSTEM_INSTRUCTION: &str = "\
You are an expert musicologist and audio engineer AI.
Your task is to analyze audio inputs and provide a structured musical analysis.
1. Identify the instruments present.
2. Estimate the Tempo (BPM) and Key Signature.
3. Transcribe every part in ABC notation. Always include a 'Full Score' part \
and one part per instrument where practical. Do not summarize; write out the notes.
4. Provide a brief description of the musical style and mood.

Output strictly JSON.
";

const USER_PROMPT: &str =
    "Analyze this audio clip. Identify instruments, tempo, key, and transcribe every part to ABC notation.";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Transcribes audio through the Gemini generateContent API. Each call runs
/// on its own thread; the response is demanded as strict JSON via a response
/// schema.
pub struct GeminiAnalysis {
    config: GeminiConfig,
}

impl GeminiAnalysis {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

impl AnalysisPort for GeminiAnalysis {
    fn analyze(&self, upload: AudioUpload, done: AnalysisCallback) {
        let config = self.config.clone();
        std::thread::spawn(move || {
            tracing::debug!(model = %config.model, file = %upload.file_name, "starting analysis");
            done(run_analysis(&config, &upload));
        });
    }
}

fn run_analysis(
    config: &GeminiConfig,
    upload: &AudioUpload,
) -> Result<AnalysisResult, AnalysisError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| AnalysisError::Remote(e.to_string()))?;

    let url = format!("{}/models/{}:generateContent", config.base_url, config.model);
    let response = client
        .post(&url)
        .header("x-goog-api-key", &config.api_key)
        .json(&request_body(upload))
        .send()
        .map_err(|e| AnalysisError::Remote(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(AnalysisError::Remote(format!(
            "http {}: {}",
            status.as_u16(),
            truncate(&body, 300)
        )));
    }

    let envelope: GenerateContentResponse = response
        .json()
        .map_err(|e| AnalysisError::Contract(e.to_string()))?;
    parse_payload(payload_text(&envelope)?)
}

fn request_body(upload: &AudioUpload) -> Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": upload.mime_type,
                        "data": BASE64.encode(&upload.bytes),
                    }
                },
                { "text": USER_PROMPT }
            ]
        }],
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "instruments": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "List of detected instruments"
                    },
                    "tempo": { "type": "STRING", "description": "Estimated BPM" },
                    "keySignature": { "type": "STRING", "description": "Key of the piece" },
                    "partTranscriptions": {
                        "type": "OBJECT",
                        "description": "Map of part names (e.g. 'Full Score', 'Piano', 'Vocals') to ABC notation strings. Always include 'Full Score'."
                    },
                    "description": { "type": "STRING", "description": "Brief musical analysis" }
                },
                "required": ["instruments", "tempo", "keySignature", "partTranscriptions", "description"]
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn payload_text(envelope: &GenerateContentResponse) -> Result<&str, AnalysisError> {
    envelope
        .candidates
        .as_deref()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.as_deref())
        .and_then(|parts| parts.first())
        .and_then(|part| part.text.as_deref())
        .ok_or_else(|| AnalysisError::Contract("no candidate text in response".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload {
    instruments: Vec<String>,
    tempo: String,
    key_signature: String,
    // serde_json's preserve_order keeps the analyzer's part order here.
    part_transcriptions: serde_json::Map<String, Value>,
    description: String,
}

fn parse_payload(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let payload: AnalysisPayload =
        serde_json::from_str(text).map_err(|e| AnalysisError::Contract(e.to_string()))?;

    let mut parts = Vec::with_capacity(payload.part_transcriptions.len());
    for (name, value) in payload.part_transcriptions {
        let source = value
            .as_str()
            .ok_or_else(|| AnalysisError::Contract(format!("part '{name}' is not a string")))?;
        parts.push(PartSource {
            name,
            source: source.to_string(),
        });
    }

    Ok(AnalysisResult {
        instruments: payload.instruments,
        tempo: payload.tempo,
        key_signature: payload.key_signature,
        parts,
        description: payload.description,
    })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_parses_parts_in_document_order() {
        let text = r#"{
            "instruments": ["Piano", "Violin"],
            "tempo": "96 BPM",
            "keySignature": "D major",
            "partTranscriptions": {
                "Full Score": "X:1\nK:D\n[DFA]4|",
                "Violin": "X:1\nK:D\nAFDF|",
                "Piano": "X:1\nK:D\nD,4|"
            },
            "description": "A gentle duet."
        }"#;

        let result = parse_payload(text).unwrap();
        let names: Vec<&str> = result.parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Full Score", "Violin", "Piano"]);
        assert_eq!(result.tempo, "96 BPM");
        assert_eq!(result.key_signature, "D major");
    }

    #[test]
    fn missing_fields_violate_the_contract() {
        let text = r#"{ "instruments": [], "partTranscriptions": {}, "description": "" }"#;
        assert!(matches!(
            parse_payload(text),
            Err(AnalysisError::Contract(_))
        ));
    }

    #[test]
    fn non_string_part_violates_the_contract() {
        let text = r#"{
            "instruments": [],
            "tempo": "?",
            "keySignature": "?",
            "partTranscriptions": { "Full Score": 42 },
            "description": ""
        }"#;
        assert!(matches!(
            parse_payload(text),
            Err(AnalysisError::Contract(_))
        ));
    }

    #[test]
    fn empty_part_map_is_passed_through() {
        let text = r#"{
            "instruments": [],
            "tempo": "?",
            "keySignature": "?",
            "partTranscriptions": {},
            "description": ""
        }"#;
        assert!(parse_payload(text).unwrap().parts.is_empty());
    }

    #[test]
    fn candidate_text_is_unwrapped_from_the_envelope() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{ "candidates": [ { "content": { "parts": [ { "text": "{}" } ] } } ] }"#,
        )
        .unwrap();
        assert_eq!(payload_text(&envelope).unwrap(), "{}");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            payload_text(&empty),
            Err(AnalysisError::Contract(_))
        ));
    }

    #[test]
    fn request_carries_audio_and_schema() {
        let upload = AudioUpload {
            bytes: vec![1, 2, 3],
            mime_type: "audio/mpeg".to_string(),
            file_name: "take.mp3".to_string(),
        };
        let body = request_body(&upload);

        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "audio/mpeg");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "AQID");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "partTranscriptions"));
    }
}
