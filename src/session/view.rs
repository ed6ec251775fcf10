use serde::Serialize;
use uuid::Uuid;

use crate::{
    comments::CommentForest,
    recipe::{Ingredient, NutritionInfo, Step},
    shopping::ShoppingItem,
    timer::TimerView,
};

/// Timer controls for a step that has a timer attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTimerView {
    pub label: String,
    pub duration_minutes: f64,
    pub state: TimerView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub number: u32,
    pub text: String,
    /// `None` means the step shows no timer controls.
    pub timer: Option<StepTimerView>,
}

impl StepView {
    pub fn new(step: Step, timer: Option<StepTimerView>) -> Self {
        Self {
            number: step.number,
            text: step.text,
            timer,
        }
    }
}

/// Combined read model for the recipe detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub original_servings: u32,
    pub requested_servings: u32,
    pub scaled_ingredients: Vec<Ingredient>,
    pub scaled_nutrition: NutritionInfo,
    pub steps: Vec<StepView>,
    pub timers: Vec<TimerView>,
    pub comment_forest: CommentForest,
    pub average_rating: f64,
    pub own_rating: Option<u8>,
    pub shopping_list: Vec<ShoppingItem>,
}
