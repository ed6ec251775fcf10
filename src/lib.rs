//! Interactive engine behind a recipe detail page: per-step countdown timers,
//! serving-count scaling and threaded comments, tied together by a session
//! controller that resets everything whenever a different recipe is shown.

pub mod audio;
pub mod comments;
pub mod error;
pub mod events;
pub mod rating;
pub mod recipe;
pub mod scaling;
pub mod session;
pub mod settings;
pub mod shopping;
pub mod timer;
mod utils;

pub use audio::{CompletionCue, SilentCue};
pub use comments::{build_tree, Comment, CommentAuthor, CommentForest, CommentNode, OrphanPolicy};
pub use error::{Result, SessionError};
pub use events::{SessionEvent, SessionEventKind};
pub use recipe::{Ingredient, NutritionInfo, RecipeSnapshot, TimerSpec};
pub use scaling::{scale, ScalingEngine};
pub use session::{RecipeSessionController, SessionView};
pub use settings::{ChimeSettings, SessionConfig, SettingsStore};
pub use timer::{TimerManager, TimerStatus, TimerView};

/// Initialize logging (reads RUST_LOG env var, defaults to info).
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
