//! Recipe snapshot as supplied by the data loader, plus the values derived
//! from it (numbered steps, assistant requests).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl NutritionInfo {
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fats", self.fats),
        ]
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            calories: f(self.calories),
            protein: f(self.protein),
            carbs: f(self.carbs),
            fats: f(self.fats),
        }
    }
}

/// Countdown attached to one preparation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSpec {
    #[serde(alias = "step_number")]
    pub step_number: u32,
    #[serde(alias = "duration", alias = "duration_minutes")]
    pub duration_minutes: f64,
    #[serde(default)]
    pub label: String,
}

/// Immutable data for one recipe id, captured once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSnapshot {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub servings: i64,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, alias = "nutritional_info")]
    pub nutritional_info: NutritionInfo,
    #[serde(default, alias = "preparation_steps")]
    pub preparation_steps: String,
    #[serde(default)]
    pub timers: Vec<TimerSpec>,
    #[serde(default)]
    pub rating: f64,
}

impl RecipeSnapshot {
    pub fn validate(&self) -> Result<()> {
        if self.servings <= 0 || self.servings > u32::MAX as i64 {
            return Err(SessionError::InvalidRecipe(format!(
                "servings must be positive, got {}",
                self.servings
            )));
        }

        if let Some(bad) = self
            .ingredients
            .iter()
            .find(|ing| !ing.quantity.is_finite() || ing.quantity < 0.0)
        {
            return Err(SessionError::InvalidRecipe(format!(
                "ingredient {:?} has quantity {}",
                bad.name, bad.quantity
            )));
        }

        if let Some((field, value)) = self
            .nutritional_info
            .fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(SessionError::InvalidRecipe(format!(
                "nutrition field {field} is {value}"
            )));
        }

        if self.timers.iter().any(|timer| timer.step_number == 0) {
            return Err(SessionError::InvalidRecipe(
                "timer step numbers start at 1".into(),
            ));
        }

        let step_count = self.steps().len();
        let mut seen = HashSet::with_capacity(self.timers.len());
        for timer in &self.timers {
            if timer.step_number as usize > step_count {
                return Err(SessionError::InvalidRecipe(format!(
                    "timer for step {} but the recipe has {} step(s)",
                    timer.step_number, step_count
                )));
            }
            if !seen.insert(timer.step_number) {
                return Err(SessionError::InvalidRecipe(format!(
                    "more than one timer for step {}",
                    timer.step_number
                )));
            }
        }

        Ok(())
    }

    pub fn timer_for_step(&self, step_number: u32) -> Option<&TimerSpec> {
        self.timers.iter().find(|t| t.step_number == step_number)
    }

    pub fn steps(&self) -> Vec<Step> {
        steps(&self.preparation_steps)
    }
}

/// One line of the preparation text, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub number: u32,
    pub text: String,
}

/// Splits free-text instructions into numbered steps.
/// Blank lines keep their number so timers stay aligned with the text.
pub fn steps(instructions: &str) -> Vec<Step> {
    instructions
        .lines()
        .enumerate()
        .map(|(index, line)| Step {
            number: index as u32 + 1,
            text: line.trim().to_string(),
        })
        .collect()
}

/// Opaque request handed to the ingredient-substitution assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    pub ingredients: Vec<String>,
}

impl SubstitutionRequest {
    pub fn for_ingredient(name: &str) -> Self {
        Self {
            ingredients: vec![name.to_string()],
        }
    }
}
