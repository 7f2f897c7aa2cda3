//! Stage, selection and episode types.
//!
//! Every artifact is plain text. These types only give each blob its role name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One step of the episode pipeline.
///
/// Each stage maps to exactly one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Topic → title + one-line pitch
    Concept,
    /// Concept → flash-card outline (n variants)
    Outline,
    /// Outlines → best outline + scores
    EvalOutline,
    /// Best outline → full script draft (n variants)
    Script,
    /// Script drafts → best script + editor review
    EvalScript,
    /// Compiled episode → listing copy
    Description,
    /// Concept → image generator prompt
    CoverArt,
    /// Concept → music generator prompts
    ThemeSong,
    /// Script review → final article
    Episode,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 9] = [
        Stage::Concept,
        Stage::Outline,
        Stage::EvalOutline,
        Stage::Script,
        Stage::EvalScript,
        Stage::CoverArt,
        Stage::ThemeSong,
        Stage::Episode,
        Stage::Description,
    ];

    /// Snake-case name, matching config keys and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Concept => "concept",
            Stage::Outline => "outline",
            Stage::EvalOutline => "eval_outline",
            Stage::Script => "script",
            Stage::EvalScript => "eval_script",
            Stage::Description => "description",
            Stage::CoverArt => "cover_art",
            Stage::ThemeSong => "theme_song",
            Stage::Episode => "episode",
        }
    }

    /// Sampling temperature used unless the config overrides it.
    ///
    /// Creative stages run hot; selectors run cold so the verbatim copy holds.
    pub fn default_temperature(&self) -> f64 {
        match self {
            Stage::EvalOutline => 0.3,
            Stage::EvalScript => 0.2,
            Stage::Episode => 0.5,
            _ => 1.0,
        }
    }

    /// Whether this stage asks the model to choose among candidates.
    pub fn is_selector(&self) -> bool {
        matches!(self, Stage::EvalOutline | Stage::EvalScript)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a selector stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Full model response: the chosen candidate plus the report
    pub response: String,

    /// Index of the candidate reproduced verbatim in `response`, if any
    pub winner: Option<usize>,
}

impl Selection {
    /// The recognised winning candidate, if the model copied one verbatim.
    pub fn winning<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        self.winner
            .and_then(|idx| candidates.get(idx))
            .map(String::as_str)
    }
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Topic the run was seeded with
    pub topic: String,

    /// Title + one-sentence pitch
    pub concept: String,

    /// Candidate outlines, in generation order
    pub outlines: Vec<String>,

    /// Outline evaluator output
    pub best_outline: Selection,

    /// Candidate scripts, in generation order
    pub script_drafts: Vec<String>,

    /// Script evaluator output (best script + review)
    pub script_review: Selection,

    /// Prompt for an image generator
    pub cover_art_prompt: String,

    /// Prompts for a music generator
    pub theme_song_prompt: String,

    /// Listing copy, when description generation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Final compiled article
    pub episode: String,

    /// Directory the artifacts were written to
    pub output_dir: PathBuf,
}

/// Statistics for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Generation calls issued
    pub generation_calls: usize,

    /// Artifact files written
    pub files_written: usize,

    /// Prompt tokens reported by the service
    pub prompt_tokens: u64,

    /// Completion tokens reported by the service
    pub completion_tokens: u64,

    /// Total runtime in seconds
    pub runtime_secs: f64,
}
