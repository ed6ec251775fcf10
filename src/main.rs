use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use recipe_session::{
    init_logging, ChimeSettings, Comment, CompletionCue, RecipeSessionController, RecipeSnapshot,
    SessionEventKind, SessionView, SettingsStore, SilentCue,
};

/// Load a recipe, print its scaled ingredients and comment threads, and
/// optionally run one step timer to completion.
#[derive(Parser, Debug)]
#[command(name = "recipe-session", version)]
struct Args {
    /// Recipe JSON as returned by the recipe loader
    recipe: PathBuf,

    /// Flat comment list JSON
    #[arg(long)]
    comments: Option<PathBuf>,

    /// Serving count to scale to
    #[arg(long)]
    servings: Option<String>,

    /// Step number whose timer should be run
    #[arg(long)]
    timer: Option<u32>,

    /// Settings JSON (written when --volume or --mute/--unmute change the chime)
    #[arg(long, env = "RECIPE_SESSION_CONFIG", default_value = "recipe-session.json")]
    config: PathBuf,

    /// Save a new chime volume (0.0 - 1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Save the chime as disabled
    #[arg(long, conflicts_with = "unmute")]
    mute: bool,

    /// Save the chime as enabled
    #[arg(long)]
    unmute: bool,

    /// Do not play the completion chime for this run only
    #[arg(long)]
    silent: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let settings = SettingsStore::new(args.config.clone())?;
    if let Some(chime) = chime_update(&args, settings.chime()) {
        settings.update_chime(chime)?;
        info!("chime settings saved to {}", args.config.display());
    }
    let config = settings.config().with_env_overrides();
    info!("tick interval {}ms, orphan policy {:?}", config.tick_interval_ms, config.orphan_policy);

    let recipe: RecipeSnapshot = read_json(&args.recipe)?;
    let comments: Vec<Comment> = match &args.comments {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let cue = completion_cue(&args, &settings);
    let controller = RecipeSessionController::new(config, cue.clone());

    let mut view = controller.load_recipe(recipe, comments).await?;
    if let Some(servings) = &args.servings {
        view = controller.change_servings_input(servings).await?;
    }
    print_view(&view);

    if let Some(step) = args.timer {
        run_timer(&controller, step).await?;
    }

    controller.unload().await;

    // Let a chime that is still sounding play out before the process exits.
    match tokio::task::spawn_blocking(move || cue.finish()).await? {
        Ok(()) => {}
        Err(err) => warn!("audio shutdown failed: {}", err),
    }
    Ok(())
}

fn chime_update(args: &Args, current: ChimeSettings) -> Option<ChimeSettings> {
    if args.volume.is_none() && !args.mute && !args.unmute {
        return None;
    }
    let mut chime = current;
    if let Some(volume) = args.volume {
        chime.volume = volume;
    }
    if args.mute {
        chime.enabled = false;
    }
    if args.unmute {
        chime.enabled = true;
    }
    Some(chime)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(feature = "audio")]
fn completion_cue(args: &Args, settings: &SettingsStore) -> Arc<dyn CompletionCue> {
    if args.silent {
        Arc::new(SilentCue)
    } else {
        Arc::new(recipe_session::audio::AudioEngineHandle::new(settings.chime()))
    }
}

#[cfg(not(feature = "audio"))]
fn completion_cue(_args: &Args, _settings: &SettingsStore) -> Arc<dyn CompletionCue> {
    Arc::new(SilentCue)
}

fn print_view(view: &SessionView) {
    println!("{} ({} servings)", view.recipe_name, view.requested_servings);
    println!();
    for ingredient in &view.scaled_ingredients {
        println!("  {} - {} {}", ingredient.name, ingredient.quantity, ingredient.unit);
    }

    let nutrition = view.scaled_nutrition;
    println!();
    println!(
        "  calories {}  protein {}  carbs {}  fats {}",
        nutrition.calories, nutrition.protein, nutrition.carbs, nutrition.fats
    );

    println!();
    for step in &view.steps {
        match &step.timer {
            Some(timer) => println!(
                "{}. {}  [{} {} min]",
                step.number, step.text, timer.label, timer.duration_minutes
            ),
            None => println!("{}. {}", step.number, step.text),
        }
    }

    if !view.comment_forest.is_empty() {
        println!();
        for (depth, comment) in view.comment_forest.flatten() {
            println!("{}{}: {}", "  ".repeat(depth + 1), comment.username, comment.content);
        }
    }
}

async fn run_timer(controller: &RecipeSessionController, step: u32) -> Result<()> {
    let mut events = controller.subscribe();
    println!();
    controller.start_timer(step).await?;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Err(anyhow!("event stream closed")),
        };
        match event.kind {
            SessionEventKind::TimerChanged { timer } if timer.step_number == step => {
                println!("step {} timer: {}", step, timer.display);
            }
            SessionEventKind::TimerCompleted { step_number } if step_number == step => {
                println!("step {} done", step);
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["recipe-session", "recipe.json"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn no_chime_flags_leave_settings_alone() {
        assert_eq!(chime_update(&args(&["--silent"]), ChimeSettings::default()), None);
    }

    #[test]
    fn chime_flags_override_stored_values() {
        let stored = ChimeSettings::default();

        let updated = chime_update(&args(&["--volume", "0.25"]), stored.clone()).unwrap();
        assert_eq!(updated.volume, 0.25);
        assert!(updated.enabled);

        let muted = chime_update(&args(&["--mute"]), stored.clone()).unwrap();
        assert!(!muted.enabled);
        assert_eq!(muted.volume, stored.volume);

        assert!(Args::try_parse_from(["recipe-session", "r.json", "--mute", "--unmute"]).is_err());
    }

    #[test]
    fn volume_flag_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let chime = chime_update(&args(&["--volume", "4"]), store.chime()).unwrap();
        store.update_chime(chime).unwrap();

        assert!(path.exists());
        assert_eq!(SettingsStore::new(path).unwrap().chime().volume, 1.0);
    }
}
