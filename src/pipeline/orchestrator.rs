//! Episode pipeline.
//!
//! Pipeline flow:
//! Topic → Concept → Outlines (n) → Best outline → Scripts (n) → Script review
//!   → {Cover art, Theme song} → Episode → [Description]
//!
//! Each stage is one generation call; its output is written to the episode
//! directory before the next stage starts. The first error ends the run and
//! whatever was already written stays on disk.

use crate::artifact::{ArtifactValue, ArtifactWriter};
use crate::client::GenerationClient;
use crate::models::{Config, ConfigError, Episode, Result, RunStats, Stage};
use crate::pipeline::selector;
use crate::prompt::PromptRenderer;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Artifact names, as they appear on disk.
pub mod artifact_names {
    pub const CONCEPT: &str = "concept";
    pub const OUTLINES: &str = "outlines";
    pub const BEST_OUTLINE: &str = "best_outline";
    pub const SCRIPT_DRAFTS: &str = "script_drafts";
    pub const SCRIPT_DRAFT_REVIEW: &str = "script_draft_review";
    pub const COVER_ART_PROMPT: &str = "cover_art_prompt";
    pub const THEME_SONG_PROMPT: &str = "theme_song_prompt";
    pub const EPISODE: &str = "episode";
    pub const DESCRIPTION: &str = "description";
}

use artifact_names as names;

/// Generates one episode from the configured topic.
pub struct EpisodePipeline {
    config: Config,
    client: Arc<dyn GenerationClient>,
    show_progress: bool,
}

/// Per-run bookkeeping: progress bar plus counters.
struct RunTracker<'a> {
    bar: ProgressBar,
    writer: &'a ArtifactWriter,
    stats: RunStats,
}

impl RunTracker<'_> {
    fn begin(&self, stage: Stage) {
        self.bar.set_message(stage.as_str());
        info!(stage = %stage, "Stage started");
    }

    fn called(&mut self) {
        self.stats.generation_calls += 1;
    }

    fn persist(&mut self, artifacts: &[(&str, ArtifactValue<'_>)]) -> Result<()> {
        self.stats.files_written += self.writer.write(artifacts)?.len();
        self.bar.inc(1);
        Ok(())
    }
}

impl EpisodePipeline {
    /// Create a pipeline. Templates are checked up front so a bad override
    /// fails before any request is sent.
    pub fn new(config: Config, client: Arc<dyn GenerationClient>) -> Result<Self> {
        config.validate()?;
        PromptRenderer::new(&config).validate_templates()?;

        Ok(Self {
            config,
            client,
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage for the configured topic.
    pub async fn run(&self) -> Result<(Episode, RunStats)> {
        let topic = self.config.selected_topic()?.to_string();
        self.run_topic(&topic).await
    }

    /// Run every stage for `topic`.
    pub async fn run_topic(&self, topic: &str) -> Result<(Episode, RunStats)> {
        if topic.trim().is_empty() {
            return Err(ConfigError::Invalid("topic must not be blank".into()).into());
        }

        let start = Instant::now();
        let usage_before = self.client.usage();
        let renderer = PromptRenderer::new(&self.config);
        let writer = ArtifactWriter::new(self.config.episode_dir(topic));
        let client = self.client.as_ref();

        let total_steps = if self.config.describe_episode { 9 } else { 8 };
        let mut run = RunTracker {
            bar: self.progress_bar(total_steps),
            writer: &writer,
            stats: RunStats::default(),
        };

        info!(
            topic = topic,
            model = %self.config.model_name,
            client = client.name(),
            outlines = self.config.n_of_outlines,
            script_drafts = self.config.n_of_script_drafts,
            output = %writer.dir().display(),
            "Starting episode pipeline"
        );

        // Concept
        run.begin(Stage::Concept);
        let concept = client
            .generate_one(&renderer.render_input(Stage::Concept, topic)?)
            .await?;
        run.called();
        run.persist(&[(names::CONCEPT, ArtifactValue::from(&concept))])?;

        // Outline candidates
        run.begin(Stage::Outline);
        let outline_spec = renderer
            .render_input(Stage::Outline, &concept)?
            .with_n(self.config.n_of_outlines);
        let outlines = client.generate_many(&outline_spec).await?;
        run.called();
        run.persist(&[(names::OUTLINES, ArtifactValue::from(&outlines))])?;

        // Outline selection
        run.begin(Stage::EvalOutline);
        let best_outline = selector::select(client, &renderer, Stage::EvalOutline, &outlines).await?;
        run.called();
        run.persist(&[(names::BEST_OUTLINE, ArtifactValue::from(&best_outline.response))])?;

        // Script candidates, written from the full evaluator response
        run.begin(Stage::Script);
        let script_spec = renderer
            .render_input(Stage::Script, &best_outline.response)?
            .with_n(self.config.n_of_script_drafts);
        let script_drafts = client.generate_many(&script_spec).await?;
        run.called();
        run.persist(&[(names::SCRIPT_DRAFTS, ArtifactValue::from(&script_drafts))])?;

        // Script selection + editor review
        run.begin(Stage::EvalScript);
        let script_review =
            selector::select(client, &renderer, Stage::EvalScript, &script_drafts).await?;
        run.called();
        run.persist(&[(
            names::SCRIPT_DRAFT_REVIEW,
            ArtifactValue::from(&script_review.response),
        )])?;

        // Cover art and theme song both derive from the concept only
        let art_spec = renderer.render_input(Stage::CoverArt, &concept)?;
        let song_spec = renderer.render_input(Stage::ThemeSong, &concept)?;
        let (cover_art_prompt, theme_song_prompt) = if self.config.parallel_copy {
            run.begin(Stage::CoverArt);
            run.begin(Stage::ThemeSong);
            let (art, song) =
                tokio::try_join!(client.generate_one(&art_spec), client.generate_one(&song_spec))?;
            run.called();
            run.called();
            run.persist(&[(names::COVER_ART_PROMPT, ArtifactValue::from(&art))])?;
            run.persist(&[(names::THEME_SONG_PROMPT, ArtifactValue::from(&song))])?;
            (art, song)
        } else {
            run.begin(Stage::CoverArt);
            let art = client.generate_one(&art_spec).await?;
            run.called();
            run.persist(&[(names::COVER_ART_PROMPT, ArtifactValue::from(&art))])?;

            run.begin(Stage::ThemeSong);
            let song = client.generate_one(&song_spec).await?;
            run.called();
            run.persist(&[(names::THEME_SONG_PROMPT, ArtifactValue::from(&song))])?;
            (art, song)
        };

        // Final article
        run.begin(Stage::Episode);
        let episode = client
            .generate_one(&renderer.render_input(Stage::Episode, &script_review.response)?)
            .await?;
        run.called();
        run.persist(&[(names::EPISODE, ArtifactValue::from(&episode))])?;

        // Listing copy
        let description = if self.config.describe_episode {
            run.begin(Stage::Description);
            let description = client
                .generate_one(&renderer.render_input(Stage::Description, &episode)?)
                .await?;
            run.called();
            run.persist(&[(names::DESCRIPTION, ArtifactValue::from(&description))])?;
            Some(description)
        } else {
            None
        };

        let usage_after = client.usage();
        let mut stats = run.stats;
        stats.prompt_tokens = usage_after
            .prompt_tokens
            .saturating_sub(usage_before.prompt_tokens);
        stats.completion_tokens = usage_after
            .completion_tokens
            .saturating_sub(usage_before.completion_tokens);
        stats.runtime_secs = start.elapsed().as_secs_f64();

        run.bar.finish_with_message("episode compiled");

        info!(
            topic = topic,
            calls = stats.generation_calls,
            files = stats.files_written,
            prompt_tokens = stats.prompt_tokens,
            completion_tokens = stats.completion_tokens,
            runtime = %format!("{:.1}s", stats.runtime_secs),
            "Episode pipeline complete"
        );

        let episode = Episode {
            topic: topic.to_string(),
            concept,
            outlines,
            best_outline,
            script_drafts,
            script_review,
            cover_art_prompt,
            theme_song_prompt,
            description,
            episode,
            output_dir: writer.dir().to_path_buf(),
        };

        Ok((episode, stats))
    }

    fn progress_bar(&self, steps: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(steps);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb
    }
}
