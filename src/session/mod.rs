pub mod controller;
pub mod view;

pub use controller::RecipeSessionController;
pub use view::{SessionView, StepTimerView, StepView};
