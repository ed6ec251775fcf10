use serde::Serialize;
use std::collections::BTreeSet;

use crate::recipe::Ingredient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub checked: bool,
}

/// Check-off state for the shopping list. Quantities always come from the
/// currently displayed scaling, so ticks survive serving changes.
#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    checked: BTreeSet<String>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips an item and returns its new checked state.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.checked.remove(name) {
            false
        } else {
            self.checked.insert(name.to_string());
            true
        }
    }

    pub fn is_checked(&self, name: &str) -> bool {
        self.checked.contains(name)
    }

    pub fn items(&self, ingredients: &[Ingredient]) -> Vec<ShoppingItem> {
        ingredients
            .iter()
            .map(|ing| ShoppingItem {
                name: ing.name.clone(),
                quantity: ing.quantity,
                unit: ing.unit.clone(),
                checked: self.is_checked(&ing.name),
            })
            .collect()
    }
}
