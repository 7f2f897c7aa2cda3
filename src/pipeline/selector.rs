//! Selector stages: ask the model to pick the best of several candidates.
//!
//! The model is instructed to copy the winner verbatim and append its report.
//! Nothing here parses that structure; the whole response travels on as the
//! selection. [`find_winner`] only tries to recognise which candidate was
//! copied, for callers that want the strict winner.

use crate::client::GenerationClient;
use crate::models::{PodError, Result, Selection, Stage};
use crate::prompt::PromptRenderer;
use tracing::{debug, warn};

/// Separator placed between outlines in the evaluation prompt.
pub const OUTLINE_SEPARATOR: &str = "\nOUTLINE: \n";

/// Separator placed between script drafts in the review prompt.
pub const SCRIPT_SEPARATOR: &str = "\n=== SCRIPT DRAFT ===\n";

/// Candidate separator for a selector stage.
pub fn separator(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::EvalOutline => Some(OUTLINE_SEPARATOR),
        Stage::EvalScript => Some(SCRIPT_SEPARATOR),
        _ => None,
    }
}

/// Join candidates the way the selector prompt presents them.
pub fn join_candidates(stage: Stage, candidates: &[String]) -> Result<String> {
    let sep = separator(stage)
        .ok_or_else(|| PodError::Internal(format!("stage '{stage}' is not a selector")))?;
    Ok(candidates.join(sep))
}

/// Index of the candidate reproduced verbatim in `response`.
///
/// Candidates are compared trimmed; blank candidates never match. When more
/// than one matches, the longest wins (a short candidate can be a substring
/// of a longer one).
pub fn find_winner(response: &str, candidates: &[String]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, c.trim()))
        .filter(|(_, c)| !c.is_empty() && response.contains(c))
        .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
        .map(|(idx, _)| idx)
}

/// Run one selector stage over `candidates`.
///
/// A single candidate is still sent for evaluation.
pub async fn select(
    client: &dyn GenerationClient,
    renderer: &PromptRenderer<'_>,
    stage: Stage,
    candidates: &[String],
) -> Result<Selection> {
    let joined = join_candidates(stage, candidates)?;
    let spec = renderer.render_input(stage, &joined)?;

    debug!(stage = %stage, candidates = candidates.len(), "Evaluating candidates");
    let response = client.generate_one(&spec).await?;

    let winner = find_winner(&response, candidates);
    match winner {
        Some(idx) => debug!(stage = %stage, winner = idx, "Selected candidate recognised"),
        None => warn!(
            stage = %stage,
            candidates = candidates.len(),
            "Selection does not reproduce any candidate verbatim; using full response"
        ),
    }

    Ok(Selection { response, winner })
}
