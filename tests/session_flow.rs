use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use recipe_session::{
    Comment, CommentAuthor, CompletionCue, OrphanPolicy, RecipeSessionController, RecipeSnapshot,
    SessionConfig, SessionError, SessionEvent, SessionEventKind, TimerStatus,
};
use tokio::sync::broadcast;

#[derive(Default)]
struct CountingCue {
    plays: AtomicUsize,
}

impl CompletionCue for CountingCue {
    fn play(&self) -> Result<(), String> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn pancakes(id: i64) -> RecipeSnapshot {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": "Pancakes",
        "servings": 4,
        "ingredients": [
            {"id": 1, "name": "flour", "quantity": 2, "unit": "cup"},
            {"id": 2, "name": "milk", "quantity": 1.5, "unit": "cup"}
        ],
        "nutritional_info": {"calories": 820, "protein": 24, "carbs": 130, "fats": 18},
        "preparation_steps": "Whisk everything\nRest the batter\nFry each side",
        "timers": [
            {"step_number": 2, "duration": 1, "label": "rest"},
            {"step_number": 3, "duration": 0.05, "label": "fry"}
        ],
        "rating": 4.0
    }))
    .unwrap()
}

fn comment(id: i64, parent_id: Option<i64>) -> Comment {
    Comment {
        id,
        parent_id,
        user_id: 10 + id,
        username: format!("user{id}"),
        content: format!("comment {id}"),
        timestamp: None,
    }
}

fn setup(config: SessionConfig) -> (RecipeSessionController, Arc<CountingCue>) {
    let cue = Arc::new(CountingCue::default());
    (RecipeSessionController::new(config, cue.clone()), cue)
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn serving_changes_never_drift() {
    let (controller, _cue) = setup(SessionConfig::default());
    controller.load_recipe(pancakes(1), Vec::new()).await.unwrap();

    let view = controller.change_servings(2).await.unwrap();
    assert_eq!(view.scaled_ingredients[0].quantity, 1.0);
    assert_eq!(view.scaled_ingredients[1].quantity, 0.75);
    assert_eq!(view.scaled_nutrition.calories, 410.0);

    for servings in [3, 7, 1, 9] {
        controller.change_servings(servings).await.unwrap();
    }

    let view = controller.change_servings_input("4").await.unwrap();
    assert_eq!(view.scaled_ingredients[0].quantity, 2.0);
    assert_eq!(view.scaled_ingredients[1].quantity, 1.5);
    assert_eq!(view.scaled_nutrition.fats, 18.0);
}

#[tokio::test(start_paused = true)]
async fn timers_run_and_surface_in_the_read_model() {
    let (controller, cue) = setup(SessionConfig::default());
    controller.load_recipe(pancakes(1), Vec::new()).await.unwrap();

    controller.start_timer(2).await.unwrap();
    controller.start_timer(3).await.unwrap();

    sleep_ms(30_500).await;
    let paused = controller.pause_timer(2).await.unwrap().unwrap();
    assert_eq!(paused.remaining_secs, 30);

    sleep_ms(10_000).await;
    let view = controller.view().await.unwrap();
    let rest = view.steps[1].timer.as_ref().unwrap();
    assert_eq!(rest.state.status, TimerStatus::Paused);
    assert_eq!(rest.state.display, "0:30");

    let fry = view.steps[2].timer.as_ref().unwrap();
    assert_eq!(fry.state.status, TimerStatus::Completed);
    assert_eq!(cue.plays.load(Ordering::SeqCst), 1);

    controller.pause_timer(2).await.unwrap();
    sleep_ms(5_500).await;
    let view = controller.view().await.unwrap();
    assert_eq!(view.steps[1].timer.as_ref().unwrap().state.remaining_secs, 25);

    let stopped = controller.stop_timer(2).await.unwrap().unwrap();
    assert_eq!(stopped.status, TimerStatus::Idle);
    assert_eq!(cue.plays.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn switching_recipes_cancels_every_timer() {
    let (controller, cue) = setup(SessionConfig::default());
    let mut rx = controller.subscribe();

    let first = controller.load_recipe(pancakes(1), Vec::new()).await.unwrap();
    controller.start_timer(2).await.unwrap();
    controller.start_timer(3).await.unwrap();
    sleep_ms(1_500).await;

    let second = controller.load_recipe(pancakes(2), Vec::new()).await.unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert!(second.timers.is_empty());

    let events = drain(&mut rx);
    let discarded = events
        .iter()
        .find_map(|event| match &event.kind {
            SessionEventKind::SessionDiscarded {
                recipe_id,
                cancelled_timers,
            } => Some((event.session_id, *recipe_id, *cancelled_timers)),
            _ => None,
        })
        .unwrap();
    assert_eq!(discarded, (first.session_id, 1, 2));

    // Nothing from the old session keeps ticking.
    sleep_ms(120_000).await;
    let late = drain(&mut rx);
    assert!(late.iter().all(|event| event.session_id == second.session_id));
    assert_eq!(cue.plays.load(Ordering::SeqCst), 0);
    assert!(controller.view().await.unwrap().timers.is_empty());
}

#[tokio::test]
async fn comment_threads_and_replies() {
    let (controller, _cue) = setup(SessionConfig::default());
    let view = controller
        .load_recipe(
            pancakes(1),
            vec![comment(1, None), comment(2, Some(1)), comment(3, Some(2)), comment(4, Some(99))],
        )
        .await
        .unwrap();

    let forest = &view.comment_forest;
    assert_eq!(forest.roots.len(), 1);
    assert_eq!(forest.roots[0].replies[0].replies[0].comment.id, 3);
    assert_eq!(forest.orphans, vec![4]);
    assert_eq!(forest.len(), 3);

    let author = CommentAuthor {
        user_id: 50,
        username: "guest".into(),
    };
    let reply = controller.prepare_reply(&author, 3, "agreed").await.unwrap();
    assert_eq!(reply.parent_id, Some(3));
    assert_eq!(
        controller.prepare_reply(&author, 4_000, "hello").await,
        Err(SessionError::UnknownComment(4_000))
    );
    assert_eq!(
        controller.prepare_comment(&author, " \n ").await,
        Err(SessionError::EmptyComment)
    );

    // data layer accepted the reply; the refreshed list comes back flat
    let view = controller
        .refresh_comments(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(2)),
            comment(5, Some(3)),
        ])
        .await
        .unwrap();
    assert_eq!(view.comment_forest.len(), 4);
    assert!(view.comment_forest.orphans.is_empty());
}

#[tokio::test]
async fn orphans_can_be_promoted() {
    let config = SessionConfig {
        orphan_policy: OrphanPolicy::PromoteToRoot,
        ..SessionConfig::default()
    };
    let (controller, _cue) = setup(config);
    let view = controller
        .load_recipe(pancakes(1), vec![comment(1, Some(99))])
        .await
        .unwrap();
    assert_eq!(view.comment_forest.roots.len(), 1);
    assert_eq!(view.comment_forest.orphans, vec![1]);
}

#[tokio::test]
async fn rating_round_trip() {
    let (controller, _cue) = setup(SessionConfig::default());
    let mut rx = controller.subscribe();
    controller.load_recipe(pancakes(1), Vec::new()).await.unwrap();

    assert_eq!(
        controller.rate(7, 6).await,
        Err(SessionError::InvalidRating(6))
    );
    let request = controller.rate(7, 5).await.unwrap();
    assert_eq!(request.score, 5);

    let view = controller.apply_rating_result(5, 4.5).await.unwrap();
    assert_eq!(view.average_rating, 4.5);
    assert_eq!(view.own_rating, Some(5));

    assert!(drain(&mut rx).iter().any(|event| matches!(
        event.kind,
        SessionEventKind::RatingChanged { own_score: Some(5), .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn unload_discards_session() {
    let (controller, cue) = setup(SessionConfig::default());
    controller.load_recipe(pancakes(1), Vec::new()).await.unwrap();
    controller.start_timer(3).await.unwrap();

    assert!(controller.unload().await);
    sleep_ms(10_000).await;
    assert_eq!(cue.plays.load(Ordering::SeqCst), 0);
    assert_eq!(controller.view().await, Err(SessionError::NoRecipeLoaded));
}
