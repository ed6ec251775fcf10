//! Serving-count scaling.
//!
//! The engine keeps the recipe's native quantities untouched and always scales
//! from them, so repeated serving changes never compound rounding error.

use serde::Serialize;

use crate::error::{Result, SessionError};
use crate::recipe::{Ingredient, NutritionInfo};

const QUANTITY_DECIMALS: i32 = 2;
const NUTRITION_DECIMALS: i32 = 1;

/// Ingredients and nutrition for one requested serving count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledYield {
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    pub nutrition: NutritionInfo,
}

#[derive(Debug, Clone)]
pub struct ScalingEngine {
    original_servings: u32,
    ingredients: Vec<Ingredient>,
    nutrition: NutritionInfo,
}

impl ScalingEngine {
    pub fn new(
        original_servings: u32,
        ingredients: Vec<Ingredient>,
        nutrition: NutritionInfo,
    ) -> Result<Self> {
        if original_servings == 0 {
            return Err(SessionError::InvalidServings(original_servings.to_string()));
        }
        Ok(Self {
            original_servings,
            ingredients,
            nutrition,
        })
    }

    pub fn original_servings(&self) -> u32 {
        self.original_servings
    }

    pub fn scale_to(&self, requested_servings: u32) -> Result<ScaledYield> {
        let (ingredients, nutrition) = scale(
            &self.ingredients,
            &self.nutrition,
            self.original_servings,
            requested_servings,
        )?;
        Ok(ScaledYield {
            servings: requested_servings,
            ingredients,
            nutrition,
        })
    }
}

/// Scales quantities by `requested / original`; quantities keep two decimals,
/// nutrition one. Names and units pass through unchanged.
pub fn scale(
    ingredients: &[Ingredient],
    nutrition: &NutritionInfo,
    original_servings: u32,
    requested_servings: u32,
) -> Result<(Vec<Ingredient>, NutritionInfo)> {
    if original_servings == 0 {
        return Err(SessionError::InvalidServings(original_servings.to_string()));
    }
    if requested_servings == 0 {
        return Err(SessionError::InvalidServings(requested_servings.to_string()));
    }

    let factor = requested_servings as f64 / original_servings as f64;

    let scaled = ingredients
        .iter()
        .map(|ing| Ingredient {
            quantity: round_to(ing.quantity * factor, QUANTITY_DECIMALS),
            ..ing.clone()
        })
        .collect();

    let nutrition = nutrition.map(|value| round_to(value * factor, NUTRITION_DECIMALS));

    Ok((scaled, nutrition))
}

/// Parses a user-typed serving count.
pub fn parse_servings(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    match trimmed.parse::<i64>() {
        Ok(n) => servings_from(n),
        Err(_) => Err(SessionError::InvalidServings(trimmed.to_string())),
    }
}

pub fn servings_from(n: i64) -> Result<u32> {
    u32::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| SessionError::InvalidServings(n.to_string()))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flour() -> Vec<Ingredient> {
        vec![Ingredient {
            id: None,
            name: "flour".into(),
            quantity: 2.0,
            unit: "cup".into(),
        }]
    }

    fn nutrition() -> NutritionInfo {
        NutritionInfo {
            calories: 410.0,
            protein: 12.5,
            carbs: 61.0,
            fats: 9.3,
        }
    }

    #[test]
    fn halving_servings_halves_quantities() {
        let (scaled, _) = scale(&flour(), &nutrition(), 4, 2).unwrap();
        assert_eq!(scaled[0].quantity, 1.0);
        assert_eq!(scaled[0].name, "flour");
        assert_eq!(scaled[0].unit, "cup");
    }

    #[test]
    fn factor_one_reproduces_original() {
        let (scaled, nutri) = scale(&flour(), &nutrition(), 4, 4).unwrap();
        assert_eq!(scaled, flour());
        assert_eq!(nutri, nutrition());
    }

    #[test]
    fn rounding_precision() {
        let (scaled, nutri) = scale(&flour(), &nutrition(), 3, 1).unwrap();
        assert_eq!(scaled[0].quantity, 0.67);
        assert_eq!(nutri.calories, 136.7);
        assert_eq!(nutri.protein, 4.2);
        assert_eq!(nutri.fats, 3.1);
    }

    #[test]
    fn repeated_rescale_does_not_drift() {
        let engine = ScalingEngine::new(3, flour(), nutrition()).unwrap();
        for servings in [1, 7, 2, 11, 5] {
            engine.scale_to(servings).unwrap();
        }
        let back = engine.scale_to(3).unwrap();
        assert_eq!(back.ingredients, flour());
        assert_eq!(back.nutrition, nutrition());

        // 4 -> 2 -> 4
        let engine = ScalingEngine::new(4, flour(), nutrition()).unwrap();
        assert_eq!(engine.scale_to(2).unwrap().ingredients[0].quantity, 1.0);
        assert_eq!(engine.scale_to(4).unwrap().ingredients[0].quantity, 2.0);
    }

    #[test]
    fn zero_servings_rejected() {
        assert!(matches!(
            scale(&flour(), &nutrition(), 4, 0),
            Err(SessionError::InvalidServings(_))
        ));
        assert!(ScalingEngine::new(0, flour(), nutrition()).is_err());
    }

    #[test]
    fn parse_user_input() {
        assert_eq!(parse_servings(" 6 ").unwrap(), 6);
        assert!(parse_servings("abc").is_err());
        assert!(parse_servings("2.5").is_err());
        assert!(parse_servings("-3").is_err());
        assert!(parse_servings("0").is_err());
        assert!(servings_from(-1).is_err());
    }
}
