use crate::paginate::{PageGeometry, PagePlan};
use partita_ports::export::RasterImage;
use serde::{Deserialize, Serialize};

/// A finished export: the captured part plus everything an assembler needs
/// to bind it into pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDocument {
    pub part_name: String,
    pub transpose_semitones: i32,
    pub title: String,
    pub geometry: PageGeometry,
    pub image: RasterImage,
    pub plan: PagePlan,
}

impl ScoreDocument {
    pub fn new(
        part_name: String,
        transpose_semitones: i32,
        geometry: PageGeometry,
        image: RasterImage,
        plan: PagePlan,
    ) -> Self {
        let title = format!("{part_name} - Transposition: {transpose_semitones}");
        Self {
            part_name,
            transpose_semitones,
            title,
            geometry,
            image,
            plan,
        }
    }

    /// Stem for output files, safe on any filesystem. Spaces in part names
    /// become underscores.
    pub fn file_stem(&self) -> String {
        let stem = sanitize_file_stem(&format!("partita_{}", self.part_name));
        if stem.is_empty() {
            "partita_score".to_string()
        } else {
            stem
        }
    }
}

fn sanitize_file_stem(stem: &str) -> String {
    let mut out = String::new();
    for ch in stem.chars() {
        if ch.is_whitespace() {
            out.push('_');
            continue;
        }
        if ch.is_control()
            || matches!(
                ch,
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\u{0}'
            )
        {
            out.push('_');
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('.').to_string()
}
