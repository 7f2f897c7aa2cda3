//! Built-in user prompt templates for the Neural Kaleidoscope format.
//!
//! `{name}` is substituted at render time; see [`super::render_template`].

use crate::models::Stage;

const CONCEPT: &str = "Create a compelling episode concept for 'Neural Kaleidoscope' based on the theme: {topic}. \
The concept should be innovative, slightly provocative, and offer practical insights for personal growth. \
Respond using the following format:
    Title: [A creative, attention-grabbing title],
    Description: [A single sentence that encapsulates the episode's core idea and its potential impact on listeners' lives]";

const OUTLINE: &str = "Given the concept: {concept}, create a flash card-style outline for a short (< 15 min) 'Neural Kaleidoscope' episode.
Rewrite the title and description in a single line, making it more compelling if needed.
Generate exactly 5 bullet points that are:
    Highly thought-provoking
    Perspective-changing
    Concise yet impactful
    Based on research or established theories (no expert interviews)
    Practical or insightful for listeners
    Mind-bending analogies & interesting parallels drawn
Exclude introductions, conclusions, and time allocations. Focus solely on the core ideas that will drive the episode's content.";

const EVAL_OUTLINE: &str = "Evaluate each of these outlines for a 'Neural Kaleidoscope' episode: {outlines}
Score each outline on a scale of 1-10 for the following criteria:
    Thought-provoking nature
    Practical value for listeners
    Scientific grounding
    Originality of perspective
    Potential for listener engagement
Select the best outline based on your evaluation.
Output Format:
    BEST OUTLINE:
    [Provide an exact, unmodified copy of the best outline]
    SCORES:
    Thought-provoking nature: [Score]
    Practical value for listeners: [Score]
    Scientific grounding: [Score]
    Originality of perspective: [Score]
    Potential for listener engagement: [Score]
    TOTAL SCORE: [Sum of all scores]
    OTHER OUTLINES:
    [One-line reason for not selecting each other outline]";

const SCRIPT: &str = "Write a full podcast script draft for the 'Neural Kaleidoscope' episode based on this outline:
{best_outline}
Guidelines:
    Present the content in an article-style format, without host names or dialogue indicators.
    Use a sort of conversational tone that engages the listener directly.
    Incorporate metaphors or analogies to explain complex concepts, but ensure they are based on real-world phenomena or scientific principles.
    Provide actionable tips for listeners.
    Draw parallels between technology, human behavior, and personal growth.
    If using examples or case studies, only refer to well-known figures or documented research. Do not create fictional characters or scenarios.
    Aim for a 15-20 minute episode length (approximately 2000-2500 words).
    Do not include any audio cues, music breaks, or sound effect notes.
    Cite sources for any specific claims or statistics mentioned.
    Structure the script to flow naturally through the points in the outline, expanding on each with depth and insight.
Output Format:
    [Title]
    [Full article-style script without any audio cues or host names]
    [List of sources cited]";

const EVAL_SCRIPT: &str = "Thoroughly review these script drafts for the 'Neural Kaleidoscope' episode:
{script_drafts}
Output Format:
1. BEST SCRIPT
[Provide an exact, unmodified copy of the best script]
2. EVALUATION REPORT should not be more than 6 concise sentences.
A. Review Notes

B. Recommended Improvements
    Content Enhancements
    Specific suggestions for deepening insights
    Ideas for more engaging examples or metaphors
    Potential areas to expand upon
    Structure Refinements
    Flow improvements
    Pacing adjustments
    Transition enhancements

C. Strong Elements from Other Scripts
    List compelling points, metaphors, or explanations from other drafts that could be incorporated
    Explain how these elements could be integrated into the best script

D. Content Optimization
    Identify any low-value sections that could be removed or condensed
    Suggest replacements for removed content if necessary

Guidelines:
    Maintain the original voice and style of the best script
    Focus on actionable, specific feedback
    Consider the target audience and episode goals when making suggestions
    Ensure all recommendations align with the 'Neural Kaleidoscope' podcast style";

const DESCRIPTION: &str = "Write an enticing episode description for 'Neural Kaleidoscope' based on this script: {episode}. \
The description should be attention-grabbing, hint at the value listeners will gain, and include emojis for visual appeal. \
Limit the description to 3-4 sentences.";

const COVER_ART: &str = "Create a detailed and creative image prompt for an AI image generator to produce cover art for this 'Neural Kaleidoscope' episode. \
Concept: {concept}. The image should be visually striking, relevant to the episode's theme, and suitable for a podcast episode cover. \
Include specific details about style, colors, elements, and composition. Only in 150 words";

const THEME_SONG: &str = "Create two distinct music prompts for Suno.ai for the 'Neural Kaleidoscope' episode based on the following concept: {concept} \
1) An opening credit theme that sets the mood. \
2) An ending credit theme that provides closure, bit of positivity, sort of enlightenment. \
Include specific musical elements like instruments, tempo, mood, and style. \
Avoid abstract descriptions; focus on concrete musical information. Only in 100 words";

const EPISODE: &str = "Compile the final article for the 'Neural Kaleidoscope' episode based on this best script and the editor's review: {script_review}. \
Incorporate the suggested improvements and ensure the script flows seamlessly in entertaining & engaging manner.";

/// Built-in user template for a stage.
pub fn builtin(stage: Stage) -> &'static str {
    match stage {
        Stage::Concept => CONCEPT,
        Stage::Outline => OUTLINE,
        Stage::EvalOutline => EVAL_OUTLINE,
        Stage::Script => SCRIPT,
        Stage::EvalScript => EVAL_SCRIPT,
        Stage::Description => DESCRIPTION,
        Stage::CoverArt => COVER_ART,
        Stage::ThemeSong => THEME_SONG,
        Stage::Episode => EPISODE,
    }
}

/// The variable each stage's input is bound to.
pub fn input_variable(stage: Stage) -> &'static str {
    match stage {
        Stage::Concept => "topic",
        Stage::Outline | Stage::CoverArt | Stage::ThemeSong => "concept",
        Stage::EvalOutline => "outlines",
        Stage::Script => "best_outline",
        Stage::EvalScript => "script_drafts",
        Stage::Description => "episode",
        Stage::Episode => "script_review",
    }
}
