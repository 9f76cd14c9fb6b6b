//! Pipeline orchestrator for Reelcut.
//!
//! Coordinates acquisition, selection, narration, reconciliation and the
//! final render. Stages run strictly in order; only acquisition failure and
//! cancellation abort a run.

use crate::config::{Prompts, SelectionStrategy, Settings};
use crate::context::RunContext;
use crate::error::{ReelcutError, Result};
use crate::media::{
    force_style, CompositionSpec, FfmpegEncoder, FfmpegSceneDetector, Framing, MediaEncoder, SceneDetector, Watermark,
};
use crate::narration::{NarrationSynthesizer, ScriptStyle, ScriptWriter};
use crate::provider::{build_speech_chain, build_text_chain, FallbackChain, SpeechSynthesizer, TextGenerator};
use crate::reconcile::{
    assemble_visuals, derive_subtitles, plan_cuts, ReconcileConfig, SubtitleStyle, VariationSlot,
};
use crate::selection::{split_at_scenes, Segment, SelectionEngine, SelectionOptions};
use crate::sidecar::{generate_metadata, write_sidecar, Sidecar, VideoMetadata};
use crate::source::{acquire, MediaSource, SourceAcquirer};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Shortest clip produced by scene splitting.
const SCENE_MIN_SECONDS: f64 = 5.0;
/// Longest clip produced by scene splitting.
const SCENE_MAX_SECONDS: f64 = 60.0;

/// External collaborators the pipeline drives.
pub struct Components {
    pub text: FallbackChain<dyn TextGenerator>,
    pub speech: FallbackChain<dyn SpeechSynthesizer>,
    pub encoder: Arc<dyn MediaEncoder>,
    pub scenes: Arc<dyn SceneDetector>,
    /// Overrides URL/path detection when set.
    pub acquirer: Option<Arc<dyn SourceAcquirer>>,
}

/// Options for a single vertical clip.
#[derive(Debug, Clone)]
pub struct ClipOptions {
    pub strategy: SelectionStrategy,
    pub burn_captions: bool,
}

/// Options for a montage of short clips.
#[derive(Debug, Clone)]
pub struct MontageOptions {
    pub strategy: SelectionStrategy,
    pub count: usize,
    pub total_seconds: f64,
}

/// Options for a narrated short.
#[derive(Debug, Clone)]
pub struct NarrateOptions {
    pub strategy: SelectionStrategy,
    pub style: ScriptStyle,
    pub target_seconds: f64,
    pub variations: usize,
    pub music: Option<PathBuf>,
}

/// One finished video.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub video: PathBuf,
    pub sidecar: Option<PathBuf>,
    pub segments: Vec<Segment>,
    pub narration_seconds: Option<f64>,
    /// Whether any stage had to use its fallback.
    pub degraded: bool,
}

/// The main orchestrator.
pub struct Pipeline {
    settings: Settings,
    prompts: Arc<Prompts>,
    components: Components,
}

impl Pipeline {
    /// Create a pipeline with the real ffmpeg, yt-dlp and provider backends.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let text = build_text_chain(&settings, None);
        if text.is_empty() {
            warn!("No text provider has an API key; LLM steps will use fallbacks");
        } else {
            info!("Text providers: {}", text.names().join(" -> "));
        }

        let components = Components {
            text,
            speech: build_speech_chain(&settings),
            encoder: Arc::new(FfmpegEncoder::new()),
            scenes: Arc::new(FfmpegSceneDetector::new()),
            acquirer: None,
        };

        Self::with_components(settings, prompts, components)
    }

    /// Create a pipeline with custom components.
    pub fn with_components(settings: Settings, prompts: Prompts, components: Components) -> Result<Self> {
        std::fs::create_dir_all(settings.temp_dir())?;
        std::fs::create_dir_all(settings.output_dir())?;

        Ok(Self {
            settings,
            prompts: Arc::new(prompts),
            components,
        })
    }

    /// Restrict the text chain to one named provider.
    pub fn with_text_provider(mut self, name: &str) -> Self {
        self.components.text = build_text_chain(&self.settings, Some(name));
        self
    }

    /// Use an encoder that observes the run's cancellation signal.
    pub fn with_cancellable_encoder(mut self, ctx: &RunContext) -> Self {
        self.components.encoder = Arc::new(FfmpegEncoder::new().with_cancel(ctx.cancel_signal()));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn framing(&self) -> Framing {
        self.settings.reconcile.framing.into()
    }

    fn output_path(&self, source: &MediaSource, ctx: &RunContext, label: &str) -> PathBuf {
        let stem: String = source
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.settings
            .output_dir()
            .join(format!("{}_{}_{}.mp4", stem, label, ctx.run_id))
    }

    /// Fetch the source into the run's own directory. Failure here is terminal.
    #[instrument(skip(self, ctx))]
    pub async fn acquire(&self, ctx: &RunContext, input: &str) -> Result<MediaSource> {
        ctx.ensure_active()?;
        ctx.prepare().await?;
        let downloads = ctx.path("downloads");

        match &self.components.acquirer {
            Some(acquirer) => acquirer.fetch(input, &downloads).await.map_err(|e| match e {
                ReelcutError::Acquisition(_) | ReelcutError::Cancelled => e,
                other => ReelcutError::Acquisition(other.to_string()),
            }),
            None => acquire(input, &downloads, self.components.encoder.clone()).await,
        }
    }

    /// Silent footage cannot be mixed under the narration.
    async fn has_audio(&self, path: &Path) -> bool {
        match self.components.encoder.has_audio(path).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(path = %path.display(), "No audio stream, dropping original audio");
                false
            }
            Err(e) => {
                warn!("Could not read audio streams, dropping original audio: {}", e);
                false
            }
        }
    }

    /// Run the selection cascade. Never fails.
    pub async fn select(
        &self,
        source: &MediaSource,
        strategy: SelectionStrategy,
        options: &SelectionOptions,
    ) -> Vec<Segment> {
        let scenes = (self.settings.selection.scene_detection || strategy == SelectionStrategy::Scenes)
            .then(|| self.components.scenes.clone());
        let engine = SelectionEngine::for_strategy(
            strategy,
            self.components.text.clone(),
            self.prompts.clone(),
            scenes,
        );
        debug!(strategies = ?engine.names(), "Selection cascade");
        engine.select(source, options).await
    }

    async fn finish(
        &self,
        ctx: &RunContext,
        source: &MediaSource,
        video: PathBuf,
        segments: Vec<Segment>,
        summary: &str,
        narration: Option<(f64, Vec<String>)>,
        metadata_from_llm: bool,
    ) -> Result<RunOutput> {
        let metadata = if metadata_from_llm {
            let resolved =
                generate_metadata(&self.components.text, &self.prompts, &source.title, summary).await;
            (resolved.value, resolved.source.to_string())
        } else {
            (VideoMetadata::fallback(&source.title), "fallback".to_string())
        };

        let (narration_seconds, skipped_sentences) = match narration {
            Some((seconds, skipped)) => (Some(seconds), skipped),
            None => (None, Vec::new()),
        };

        let degraded = metadata.1 == "fallback" || segments.iter().any(|s| s.is_fallback());
        let sidecar = Sidecar {
            metadata: metadata.0,
            metadata_source: metadata.1,
            source_id: source.id.clone(),
            source_title: source.title.clone(),
            segments: segments.clone(),
            narration_seconds,
            skipped_sentences,
            seed: ctx.seed,
            created_at: Utc::now(),
        };

        let sidecar_path = match write_sidecar(&video, &sidecar).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to write sidecar: {}", e);
                None
            }
        };

        info!(video = %video.display(), "Output ready");
        Ok(RunOutput {
            video,
            sidecar: sidecar_path,
            segments,
            narration_seconds,
            degraded,
        })
    }

    /// One vertical clip with the source captions burned in.
    #[instrument(skip(self, ctx, options), fields(run = %ctx.run_id))]
    pub async fn run_clip(&self, ctx: &RunContext, input: &str, options: &ClipOptions) -> Result<RunOutput> {
        ctx.prepare().await?;
        let source = self.acquire(ctx, input).await?;

        ctx.ensure_active()?;
        let selection = SelectionOptions::from_settings(&self.settings.selection, ctx.seed);
        let segments = self.select(&source, options.strategy, &selection).await;
        let segment = segments[0].clone();
        info!("Segment {:.1}s-{:.1}s: {}", segment.start, segment.end, segment.rationale);

        ctx.ensure_active()?;
        let output = self.output_path(&source, ctx, "clip");
        let windowed = source
            .captions
            .as_ref()
            .map(|c| c.window(segment.start, segment.end))
            .filter(|c| !c.is_empty() && options.burn_captions);

        let encoder = &self.components.encoder;
        match &windowed {
            Some(captions) => {
                let raw = ctx.path("clip_raw.mp4");
                encoder
                    .extract_clip(&source.path, segment.start, segment.duration(), self.framing(), &raw)
                    .await?;
                let srt = ctx.path("clip.srt");
                tokio::fs::write(&srt, captions.to_srt()).await?;
                ctx.ensure_active()?;
                let style = force_style(self.settings.captions.subtitle_style);
                encoder.burn_subtitles(&raw, &srt, Some(&style), &output).await?;
            }
            None => {
                encoder
                    .extract_clip(&source.path, segment.start, segment.duration(), self.framing(), &output)
                    .await?;
            }
        }

        let summary = windowed
            .map(|c| c.transcript_text())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| segment.rationale.clone());
        self.finish(ctx, &source, output, segments, &summary, None, true).await
    }

    /// Several short clips joined into one video of `total_seconds`.
    #[instrument(skip(self, ctx, options), fields(run = %ctx.run_id))]
    pub async fn run_montage(&self, ctx: &RunContext, input: &str, options: &MontageOptions) -> Result<RunOutput> {
        ctx.prepare().await?;
        let source = self.acquire(ctx, input).await?;

        ctx.ensure_active()?;
        let selection = SelectionOptions::from_settings(&self.settings.selection, ctx.seed)
            .montage(options.count, options.total_seconds);
        let segments = self.select(&source, options.strategy, &selection).await;
        info!(clips = segments.len(), "Montage segments selected");

        let encoder = &self.components.encoder;
        let mut clips = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            ctx.ensure_active()?;
            let clip = ctx.path(&format!("montage_{:02}.mp4", i));
            encoder
                .extract_clip(&source.path, segment.start, segment.duration(), self.framing(), &clip)
                .await?;
            clips.push(clip);
        }

        ctx.ensure_active()?;
        let joined = ctx.path("montage_joined.mp4");
        encoder.concat_copy(&clips, &joined).await?;
        let output = self.output_path(&source, ctx, "montage");
        encoder.fit_to_duration(&joined, options.total_seconds, &output).await?;

        let summary = format!("{} highlights from {}", segments.len(), source.title);
        self.finish(ctx, &source, output, segments, &summary, None, true).await
    }

    /// Split the whole source at scene changes into vertical clips.
    #[instrument(skip(self, ctx), fields(run = %ctx.run_id))]
    pub async fn run_scenes(&self, ctx: &RunContext, input: &str) -> Result<Vec<RunOutput>> {
        ctx.prepare().await?;
        let source = self.acquire(ctx, input).await?;

        ctx.ensure_active()?;
        let timestamps = match self
            .components
            .scenes
            .detect(&source.path, self.settings.selection.scene_threshold)
            .await
        {
            Ok(t) => t,
            Err(ReelcutError::Cancelled) => return Err(ReelcutError::Cancelled),
            Err(e) => {
                warn!("Scene detection failed, splitting on fixed lengths: {}", e);
                Vec::new()
            }
        };

        let scenes = split_at_scenes(&timestamps, source.duration(), SCENE_MIN_SECONDS, SCENE_MAX_SECONDS);
        info!(changes = timestamps.len(), clips = scenes.len(), "Split at scenes");

        let mut outputs = Vec::with_capacity(scenes.len());
        for (i, scene) in scenes.into_iter().enumerate() {
            ctx.ensure_active()?;
            let output = self.output_path(&source, ctx, &format!("scene{:02}", i + 1));
            self.components
                .encoder
                .extract_clip(&source.path, scene.start, scene.duration(), self.framing(), &output)
                .await?;
            let summary = scene.rationale.clone();
            outputs.push(
                self.finish(ctx, &source, output, vec![scene], &summary, None, false)
                    .await?,
            );
        }
        Ok(outputs)
    }

    /// Narrated short(s): script, speech, reconciled visuals and subtitles.
    ///
    /// Variations run concurrently, each in its own namespace and its own
    /// share of the source. A failed variation is logged and dropped unless
    /// every variation fails.
    #[instrument(skip(self, ctx, options), fields(run = %ctx.run_id, variations = options.variations))]
    pub async fn run_narrated(
        &self,
        ctx: &RunContext,
        input: &str,
        options: &NarrateOptions,
    ) -> Result<Vec<RunOutput>> {
        ctx.prepare().await?;
        let source = self.acquire(ctx, input).await?;

        ctx.ensure_active()?;
        let selection = SelectionOptions::from_settings(&self.settings.selection, ctx.seed);
        let segment = self.select(&source, options.strategy, &selection).await.remove(0);
        info!("Narrating {:.1}s-{:.1}s: {}", segment.start, segment.end, segment.rationale);

        let transcript = narration_input(&source, &segment);
        let count = options.variations.max(1);
        let concurrency = self.settings.general.max_concurrent_variations.max(1);

        let results: Vec<(usize, Result<RunOutput>)> = stream::iter(0..count)
            .map(|i| {
                let child = if count == 1 { ctx.clone() } else { ctx.variation(i) };
                let slot = VariationSlot::new(i, count);
                let (source, segment, transcript) = (&source, &segment, transcript.as_str());
                async move {
                    let result = self
                        .run_variation(&child, source, segment, transcript, options, slot)
                        .await;
                    (i, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut outputs = Vec::new();
        let mut first_error = None;
        let mut ordered = results;
        ordered.sort_by_key(|(i, _)| *i);
        for (i, result) in ordered {
            match result {
                Ok(output) => outputs.push(output),
                Err(ReelcutError::Cancelled) => return Err(ReelcutError::Cancelled),
                Err(e) => {
                    warn!(variation = i, "Variation failed: {}", e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match (outputs.is_empty(), first_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(outputs),
        }
    }

    async fn run_variation(
        &self,
        ctx: &RunContext,
        source: &MediaSource,
        segment: &Segment,
        transcript: &str,
        options: &NarrateOptions,
        slot: VariationSlot,
    ) -> Result<RunOutput> {
        ctx.prepare().await?;
        let settings = &self.settings;
        let encoder = self.components.encoder.clone();

        let writer = ScriptWriter::new(
            self.components.text.clone(),
            self.prompts.clone(),
            settings.narration.words_per_second,
        );
        let script = writer.write(transcript, options.style, options.target_seconds).await;

        ctx.ensure_active()?;
        let synthesizer = NarrationSynthesizer::new(
            self.components.speech.clone(),
            encoder.clone(),
            settings.narration.trim_silence,
        );
        let narration = synthesizer.synthesize(ctx, &script.value).await?;
        let total = narration.duration();

        ctx.ensure_active()?;
        let config = ReconcileConfig::from_settings(&settings.reconcile);
        let plan = plan_cuts(&narration.timeline, source.duration(), &config, slot, ctx.seed)?;
        let visuals = assemble_visuals(
            encoder.as_ref(),
            ctx,
            &source.path,
            &plan,
            self.framing(),
            config.tolerance_seconds,
        )
        .await?;

        ctx.ensure_active()?;
        let subtitles = derive_subtitles(
            &narration.timeline,
            &SubtitleStyle::from_settings(&settings.captions),
            ctx.seed,
        );
        let srt = ctx.path("narration.srt");
        tokio::fs::write(&srt, subtitles.to_srt()).await?;

        let compose = &settings.compose;
        let mut spec = CompositionSpec::new(visuals.path.clone(), narration.audio_path.clone(), total);
        spec.subtitles = (!subtitles.is_empty()).then_some(srt);
        spec.subtitle_style = Some(force_style(settings.captions.subtitle_style));
        spec.music = pick_music(options.music.as_deref(), settings.music_dir().as_deref(), &script.value.mood);
        spec.narration_gain = compose.narration_gain;
        spec.original_gain = if compose.original_gain > 0.0 && self.has_audio(&visuals.path).await {
            Some(compose.original_gain)
        } else {
            None
        };
        spec.music_gain = compose.music_gain;
        if !compose.watermark.trim().is_empty() {
            spec.watermark = Some(Watermark {
                text: compose.watermark.clone(),
                font: compose.font.clone(),
            });
        }

        let label = if slot.count > 1 {
            format!("narrated_v{}", slot.index + 1)
        } else {
            "narrated".to_string()
        };
        let output = self.output_path(source, ctx, &label);
        encoder.composite(&spec, &output).await?;

        let degraded_script = script.is_fallback();
        let mut result = self
            .finish(
                ctx,
                source,
                output,
                vec![segment.clone()],
                &script.value.text(),
                Some((total, narration.skipped.clone())),
                true,
            )
            .await?;
        result.degraded |= degraded_script || !narration.skipped.is_empty();
        Ok(result)
    }
}

/// Caption text inside the segment, or the whole transcript, or the title.
fn narration_input(source: &MediaSource, segment: &Segment) -> String {
    let windowed = source
        .captions
        .as_ref()
        .map(|c| c.window(segment.start, segment.end).transcript_text())
        .unwrap_or_default();
    if !windowed.trim().is_empty() {
        return windowed;
    }

    let whole = source.transcript_text();
    if !whole.trim().is_empty() {
        return whole;
    }

    match &source.description {
        Some(d) if !d.trim().is_empty() => format!("{}. {}", source.title, d),
        _ => source.title.clone(),
    }
}

/// Explicit track, else `<music_dir>/<mood>.mp3` when it exists.
fn pick_music(explicit: Option<&Path>, music_dir: Option<&Path>, mood: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "Music file not found, continuing without music");
        return None;
    }

    let candidate = music_dir?.join(format!("{}.mp3", mood.trim().to_lowercase()));
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionCue, CaptionTrack};
    use crate::media::scene_testing::FixedScenes;
    use crate::media::testing::FakeEncoder;
    use crate::provider::testing::{speech_chain, text_chain, ScriptedSpeech, ScriptedText};
    use async_trait::async_trait;

    struct FixedSource(MediaSource);

    #[async_trait]
    impl SourceAcquirer for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn can_handle(&self, _input: &str) -> bool {
            true
        }

        async fn fetch(&self, _input: &str, _dir: &Path) -> Result<MediaSource> {
            Ok(self.0.clone())
        }
    }

    struct Missing;

    #[async_trait]
    impl SourceAcquirer for Missing {
        fn name(&self) -> &str {
            "missing"
        }

        fn can_handle(&self, _input: &str) -> bool {
            true
        }

        async fn fetch(&self, input: &str, _dir: &Path) -> Result<MediaSource> {
            Err(ReelcutError::ToolFailed(format!("yt-dlp: {} is private", input)))
        }
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.output_dir = dir.join("out").to_string_lossy().to_string();
        settings.general.temp_dir = dir.join("tmp").to_string_lossy().to_string();
        settings
    }

    fn source(duration: f64) -> MediaSource {
        MediaSource::new("abc123", PathBuf::from("abc123.mp4"), duration)
            .unwrap()
            .with_title("Deep Dive")
            .with_captions(CaptionTrack::from_cues(vec![
                CaptionCue::new(40.0, 45.0, "The engine failed at altitude."),
                CaptionCue::new(45.0, 52.0, "Nobody knew why."),
            ]))
    }

    fn pipeline(
        dir: &Path,
        encoder: Arc<FakeEncoder>,
        text: Vec<Arc<ScriptedText>>,
        acquirer: Arc<dyn SourceAcquirer>,
    ) -> Pipeline {
        let components = Components {
            text: text_chain(text),
            speech: speech_chain(vec![ScriptedSpeech::ok("edge")]),
            encoder,
            scenes: Arc::new(FixedScenes(vec![20.0, 30.0, 100.0])),
            acquirer: Some(acquirer),
        };
        Pipeline::with_components(settings(dir), Prompts::default(), components).unwrap()
    }

    fn context(dir: &Path) -> RunContext {
        RunContext::new(&dir.join("tmp"), Some(11)).0
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), Arc::new(FakeEncoder::with_default(1.0)), vec![], Arc::new(Missing));
        let err = p
            .run_clip(
                &context(dir.path()),
                "abc",
                &ClipOptions {
                    strategy: SelectionStrategy::Auto,
                    burn_captions: true,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn test_clip_survives_every_provider_failing() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(60.0));
        let p = pipeline(
            dir.path(),
            encoder.clone(),
            vec![ScriptedText::failing("groq"), ScriptedText::failing("gemini")],
            Arc::new(FixedSource(source(300.0))),
        );

        let out = p
            .run_clip(
                &context(dir.path()),
                "abc",
                &ClipOptions {
                    strategy: SelectionStrategy::Transcript,
                    burn_captions: true,
                },
            )
            .await
            .unwrap();

        assert!(out.video.exists());
        assert!(out.degraded);
        assert_eq!(out.segments[0].origin, crate::selection::SegmentOrigin::GoldenZone);
        assert!(out.sidecar.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_narrated_output_matches_narration() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(2.5));
        let script = r#"{"mood": "Dark", "narration": "", "sentences": ["The engine failed.", "Nobody knew why.", "Until now."]}"#;
        let p = pipeline(
            dir.path(),
            encoder.clone(),
            vec![ScriptedText::ok("groq", script)],
            Arc::new(FixedSource(source(300.0))),
        );

        let outputs = p
            .run_narrated(
                &context(dir.path()),
                "abc",
                &NarrateOptions {
                    strategy: SelectionStrategy::Auto,
                    style: ScriptStyle::Mystery,
                    target_seconds: 30.0,
                    variations: 1,
                    music: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].narration_seconds, Some(7.5));
        let calls = encoder.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("extract")).count(), 3);
        assert!(calls.contains(&"composite 7.500".to_string()));
        assert!(calls.contains(&"composite keeps original audio".to_string()));
        assert!(calls
            .iter()
            .any(|c| c.starts_with("composite subtitles Fontname=Impact,Fontsize=24")));
    }

    #[tokio::test]
    async fn test_silent_footage_drops_original_audio() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(2.0).silent());
        let p = pipeline(dir.path(), encoder.clone(), vec![], Arc::new(FixedSource(source(300.0))));

        let outputs = p
            .run_narrated(
                &context(dir.path()),
                "abc",
                &NarrateOptions {
                    strategy: SelectionStrategy::GoldenZone,
                    style: ScriptStyle::Ruthless,
                    target_seconds: 20.0,
                    variations: 1,
                    music: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outputs.len(), 1);
        let calls = encoder.calls();
        assert!(calls.iter().any(|c| c.starts_with("composite")));
        assert!(!calls.contains(&"composite keeps original audio".to_string()));
    }

    struct RecordingDir {
        source: MediaSource,
        dir: std::sync::Mutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl SourceAcquirer for RecordingDir {
        fn name(&self) -> &str {
            "recording"
        }

        fn can_handle(&self, _input: &str) -> bool {
            true
        }

        async fn fetch(&self, _input: &str, dir: &Path) -> Result<MediaSource> {
            *self.dir.lock().unwrap() = Some(dir.to_path_buf());
            Ok(self.source.clone())
        }
    }

    #[tokio::test]
    async fn test_downloads_stay_in_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = Arc::new(RecordingDir {
            source: source(300.0),
            dir: std::sync::Mutex::new(None),
        });
        let p = pipeline(
            dir.path(),
            Arc::new(FakeEncoder::with_default(1.0)),
            vec![],
            acquirer.clone(),
        );
        let ctx = context(dir.path());

        p.acquire(&ctx, "abc").await.unwrap();

        let used = acquirer.dir.lock().unwrap().clone().unwrap();
        assert!(used.starts_with(&ctx.work_dir));
        ctx.cleanup().await;
        assert!(!ctx.work_dir.exists());
    }

    #[tokio::test]
    async fn test_variations_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(2.0));
        let p = pipeline(
            dir.path(),
            encoder.clone(),
            vec![],
            Arc::new(FixedSource(source(600.0))),
        );

        let outputs = p
            .run_narrated(
                &context(dir.path()),
                "abc",
                &NarrateOptions {
                    strategy: SelectionStrategy::GoldenZone,
                    style: ScriptStyle::Ruthless,
                    target_seconds: 20.0,
                    variations: 3,
                    music: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        let mut videos: Vec<_> = outputs.iter().map(|o| o.video.clone()).collect();
        videos.sort();
        videos.dedup();
        assert_eq!(videos.len(), 3);
        assert!(outputs.iter().all(|o| o.degraded));
    }

    #[tokio::test]
    async fn test_scenes_mode_splits_source() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(10.0));
        let p = pipeline(dir.path(), encoder.clone(), vec![], Arc::new(FixedSource(source(130.0))));

        let outputs = p.run_scenes(&context(dir.path()), "abc").await.unwrap();
        let spans: Vec<_> = outputs
            .iter()
            .map(|o| (o.segments[0].start, o.segments[0].end))
            .collect();
        assert_eq!(
            spans,
            vec![(0.0, 20.0), (20.0, 30.0), (30.0, 90.0), (90.0, 100.0), (100.0, 130.0)]
        );
        assert!(outputs.iter().all(|o| o.sidecar.is_some()));
    }

    #[tokio::test]
    async fn test_montage_fits_total() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::with_default(3.0));
        let p = pipeline(dir.path(), encoder.clone(), vec![], Arc::new(FixedSource(source(600.0))));

        let out = p
            .run_montage(
                &context(dir.path()),
                "abc",
                &MontageOptions {
                    strategy: SelectionStrategy::GoldenZone,
                    count: 10,
                    total_seconds: 30.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(out.segments.len(), 10);
        assert!(encoder.calls().contains(&"fit 30.000".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(
            dir.path(),
            Arc::new(FakeEncoder::with_default(2.0)),
            vec![],
            Arc::new(FixedSource(source(300.0))),
        );
        let (ctx, handle) = RunContext::new(&dir.path().join("tmp"), Some(1));
        handle.cancel();
        let err = p.run_scenes(&ctx, "abc").await.unwrap_err();
        assert!(matches!(err, ReelcutError::Cancelled));
    }

    #[test]
    fn test_narration_input_prefers_segment_text() {
        let src = source(300.0);
        let inside = Segment::new(40.0, 50.0, "x", crate::selection::SegmentOrigin::GoldenZone);
        assert!(narration_input(&src, &inside).contains("engine failed"));

        let outside = Segment::new(200.0, 260.0, "x", crate::selection::SegmentOrigin::GoldenZone);
        assert!(narration_input(&src, &outside).contains("Nobody knew why"));

        let bare = MediaSource::new("x", PathBuf::from("x.mp4"), 10.0).unwrap().with_title("Title");
        assert_eq!(narration_input(&bare, &outside), "Title");
    }

    #[test]
    fn test_pick_music_by_mood() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dark.mp3"), b"x").unwrap();
        assert_eq!(pick_music(None, Some(dir.path()), "Dark"), Some(dir.path().join("dark.mp3")));
        assert_eq!(pick_music(None, Some(dir.path()), "Silly"), None);
        assert_eq!(pick_music(Some(Path::new("/nope.mp3")), Some(dir.path()), "Dark"), None);
    }
}
