use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::{
    audio::CompletionCue,
    comments::{build_tree, prepare_comment, Comment, CommentAuthor, CommentForest, CommentRequest},
    error::{Result, SessionError},
    events::{EventPublisher, SessionEvent, SessionEventKind, EVENT_CAPACITY},
    rating::{RatingRequest, RatingState},
    recipe::{RecipeSnapshot, SubstitutionRequest},
    scaling::{parse_servings, servings_from, ScaledYield, ScalingEngine},
    session::view::{SessionView, StepTimerView, StepView},
    settings::SessionConfig,
    shopping::ShoppingList,
    timer::{state::duration_secs_from_minutes, TimerManager, TimerView},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Everything that belongs to one displayed recipe id. Dropped as a whole
/// when another recipe is loaded.
struct ActiveSession {
    id: Uuid,
    recipe: RecipeSnapshot,
    scaling: ScalingEngine,
    displayed: ScaledYield,
    timers: TimerManager,
    comments: Vec<Comment>,
    forest: CommentForest,
    rating: RatingState,
    shopping: ShoppingList,
    publisher: EventPublisher,
}

impl ActiveSession {
    async fn view(&self) -> SessionView {
        let timers = self.timers.views().await;

        let steps = self
            .recipe
            .steps()
            .into_iter()
            .map(|step| {
                let timer = self.recipe.timer_for_step(step.number).map(|spec| {
                    let state = timers
                        .iter()
                        .find(|view| view.step_number == step.number)
                        .cloned()
                        .unwrap_or_else(|| {
                            TimerView::idle(
                                step.number,
                                duration_secs_from_minutes(spec.duration_minutes).unwrap_or(0),
                            )
                        });
                    StepTimerView {
                        label: spec.label.clone(),
                        duration_minutes: spec.duration_minutes,
                        state,
                    }
                });
                StepView::new(step, timer)
            })
            .collect();

        SessionView {
            session_id: self.id,
            recipe_id: self.recipe.id,
            recipe_name: self.recipe.name.clone(),
            original_servings: self.scaling.original_servings(),
            requested_servings: self.displayed.servings,
            scaled_ingredients: self.displayed.ingredients.clone(),
            scaled_nutrition: self.displayed.nutrition,
            steps,
            timers,
            comment_forest: self.forest.clone(),
            average_rating: self.rating.average,
            own_rating: self.rating.own_score,
            shopping_list: self.shopping.items(&self.displayed.ingredients),
        }
    }

    fn has_ingredient(&self, name: &str) -> bool {
        self.recipe.ingredients.iter().any(|ing| ing.name == name)
    }
}

/// Entry point for the recipe detail page.
///
/// Owns the lifecycle of one recipe at a time: loading a recipe discards the
/// previous session (cancelling all of its timers) before building the new
/// one. Inputs are validated here, before any subsystem state changes.
#[derive(Clone)]
pub struct RecipeSessionController {
    active: Arc<Mutex<Option<ActiveSession>>>,
    cue: Arc<dyn CompletionCue>,
    events: broadcast::Sender<SessionEvent>,
    config: SessionConfig,
}

impl RecipeSessionController {
    pub fn new(config: SessionConfig, cue: Arc<dyn CompletionCue>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            active: Arc::new(Mutex::new(None)),
            cue,
            events,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Displays a recipe. Any previous session is discarded first, even when
    /// the id is the same.
    pub async fn load_recipe(
        &self,
        recipe: RecipeSnapshot,
        comments: Vec<Comment>,
    ) -> Result<SessionView> {
        recipe.validate()?;
        let original_servings = servings_from(recipe.servings)?;
        let scaling = ScalingEngine::new(
            original_servings,
            recipe.ingredients.clone(),
            recipe.nutritional_info,
        )?;
        let displayed = scaling.scale_to(original_servings)?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            discard(previous).await;
        }

        let session_id = Uuid::new_v4();
        let publisher = EventPublisher::new(session_id, self.events.clone());
        let forest = build_tree(&comments, self.config.orphan_policy);

        log_info!(
            "session {} loaded recipe {} ({} servings, {} timers, {} comments)",
            session_id,
            recipe.id,
            original_servings,
            recipe.timers.len(),
            comments.len()
        );
        publisher.publish(SessionEventKind::SessionLoaded {
            recipe_id: recipe.id,
        });

        let session = active.insert(ActiveSession {
            id: session_id,
            rating: RatingState::new(recipe.rating),
            timers: TimerManager::new(
                self.config.tick_interval(),
                self.cue.clone(),
                publisher.clone(),
            ),
            recipe,
            scaling,
            displayed,
            comments,
            forest,
            shopping: ShoppingList::new(),
            publisher,
        });

        Ok(session.view().await)
    }

    /// Discards the current session, if any.
    pub async fn unload(&self) -> bool {
        let previous = self.active.lock().await.take();
        match previous {
            Some(session) => {
                discard(session).await;
                true
            }
            None => false,
        }
    }

    pub async fn view(&self) -> Result<SessionView> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        Ok(session.view().await)
    }

    pub async fn change_servings(&self, servings: i64) -> Result<SessionView> {
        let requested = servings_from(servings).map_err(|err| {
            log_debug!("rejected serving change: {}", err);
            err
        })?;
        self.apply_servings(requested).await
    }

    /// Same as [`change_servings`](Self::change_servings) for raw text input.
    pub async fn change_servings_input(&self, input: &str) -> Result<SessionView> {
        let requested = parse_servings(input).map_err(|err| {
            log_debug!("rejected serving input: {}", err);
            err
        })?;
        self.apply_servings(requested).await
    }

    async fn apply_servings(&self, requested: u32) -> Result<SessionView> {
        let mut active = self.active.lock().await;
        let session = active.as_mut().ok_or(SessionError::NoRecipeLoaded)?;

        session.displayed = session.scaling.scale_to(requested)?;
        session.publisher.publish(SessionEventKind::ServingsChanged {
            requested_servings: requested,
        });
        Ok(session.view().await)
    }

    pub async fn start_timer(&self, step_number: u32) -> Result<TimerView> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        let spec = session
            .recipe
            .timer_for_step(step_number)
            .ok_or(SessionError::UnknownStep(step_number))?;
        session.timers.start(step_number, spec.duration_minutes).await
    }

    /// Pause toggle. `Ok(None)` when the step's timer is not running or paused.
    pub async fn pause_timer(&self, step_number: u32) -> Result<Option<TimerView>> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        if session.recipe.timer_for_step(step_number).is_none() {
            return Err(SessionError::UnknownStep(step_number));
        }
        Ok(session.timers.pause(step_number).await)
    }

    pub async fn stop_timer(&self, step_number: u32) -> Result<Option<TimerView>> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        if session.recipe.timer_for_step(step_number).is_none() {
            return Err(SessionError::UnknownStep(step_number));
        }
        Ok(session.timers.stop(step_number).await)
    }

    /// Rebuilds the comment forest from a fresh flat list.
    pub async fn refresh_comments(&self, comments: Vec<Comment>) -> Result<SessionView> {
        let mut active = self.active.lock().await;
        let session = active.as_mut().ok_or(SessionError::NoRecipeLoaded)?;

        session.forest = build_tree(&comments, self.config.orphan_policy);
        session.comments = comments;
        session.publisher.publish(SessionEventKind::CommentsRefreshed {
            total: session.forest.len(),
            orphaned: session.forest.orphans.len(),
        });
        Ok(session.view().await)
    }

    pub async fn prepare_comment(&self, author: &CommentAuthor, content: &str) -> Result<CommentRequest> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        prepare_comment(author, content, None, &session.comments)
    }

    pub async fn prepare_reply(
        &self,
        author: &CommentAuthor,
        parent_id: i64,
        content: &str,
    ) -> Result<CommentRequest> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        prepare_comment(author, content, Some(parent_id), &session.comments)
    }

    pub async fn rate(&self, user_id: i64, score: i64) -> Result<RatingRequest> {
        let active = self.active.lock().await;
        active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        RatingState::request(user_id, score)
    }

    /// Records the data layer's answer to an accepted rating.
    pub async fn apply_rating_result(&self, score: i64, average: f64) -> Result<SessionView> {
        let mut active = self.active.lock().await;
        let session = active.as_mut().ok_or(SessionError::NoRecipeLoaded)?;

        session.rating.record(score, average)?;
        session.publisher.publish(SessionEventKind::RatingChanged {
            average: session.rating.average,
            own_score: session.rating.own_score,
        });
        Ok(session.view().await)
    }

    /// Flips an ingredient on the shopping list; returns whether it is now checked.
    pub async fn toggle_shopping_item(&self, name: &str) -> Result<bool> {
        let mut active = self.active.lock().await;
        let session = active.as_mut().ok_or(SessionError::NoRecipeLoaded)?;
        if !session.has_ingredient(name) {
            return Err(SessionError::UnknownIngredient(name.to_string()));
        }
        Ok(session.shopping.toggle(name))
    }

    pub async fn substitution_request(&self, ingredient: &str) -> Result<SubstitutionRequest> {
        let active = self.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NoRecipeLoaded)?;
        if !session.has_ingredient(ingredient) {
            return Err(SessionError::UnknownIngredient(ingredient.to_string()));
        }
        Ok(SubstitutionRequest::for_ingredient(ingredient))
    }
}

async fn discard(session: ActiveSession) {
    let cancelled_timers = session.timers.shutdown().await;
    log_info!(
        "session {} for recipe {} discarded, {} live timer(s) cancelled",
        session.id,
        session.recipe.id,
        cancelled_timers
    );
    session.publisher.publish(SessionEventKind::SessionDiscarded {
        recipe_id: session.recipe.id,
        cancelled_timers,
    });
}
