//! Reelcut - vertical shorts from long videos
//!
//! Turns a long video (a YouTube URL/ID or a local file) into one or more
//! 9:16 shorts: a single captioned clip, a montage, clips split at scene
//! changes, or a narrated short with a generated script, synthesized voice
//! and subtitles timed to the measured speech.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `source` - Acquisition of the source video and its side data
//! - `selection` - Strategies that pick which part of the source to use
//! - `provider` - Text and speech providers behind a fallback chain
//! - `narration` - Script writing and per-sentence speech synthesis
//! - `reconcile` - Fitting footage and subtitles to the narration timeline
//! - `media` - ffmpeg/ffprobe/yt-dlp wrappers
//! - `sidecar` - Upload metadata written next to each output
//! - `pipeline` - Stage coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use reelcut::config::{SelectionStrategy, Settings};
//! use reelcut::context::RunContext;
//! use reelcut::narration::ScriptStyle;
//! use reelcut::pipeline::{NarrateOptions, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let (ctx, _cancel) = RunContext::new(&settings.temp_dir(), Some(42));
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let options = NarrateOptions {
//!         strategy: SelectionStrategy::Auto,
//!         style: ScriptStyle::Mystery,
//!         target_seconds: 30.0,
//!         variations: 1,
//!         music: None,
//!     };
//!     for output in pipeline.run_narrated(&ctx, "dQw4w9WgXcQ", &options).await? {
//!         println!("{}", output.video.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod captions;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod media;
pub mod narration;
pub mod openai;
pub mod pipeline;
pub mod provider;
pub mod reconcile;
pub mod selection;
pub mod sidecar;
pub mod source;

pub use error::{ReelcutError, Result};
