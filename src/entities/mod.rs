//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod income;
pub mod line_item;
pub mod meal;
pub mod note;
pub mod nutrition_review;
pub mod user;
pub mod weight_entry;
pub mod weight_goal;

// Re-export specific types to avoid conflicts
pub use income::{Column as IncomeColumn, Entity as Income, Model as IncomeModel};
pub use line_item::{
    Column as LineItemColumn, Entity as LineItem, Model as LineItemModel, Pool,
};
pub use meal::{Column as MealColumn, Entity as Meal, MealType, Model as MealModel};
pub use note::{
    Column as NoteColumn, Entity as Note, Model as NoteModel, NoteType, NotificationType,
};
pub use nutrition_review::{
    Column as NutritionReviewColumn, Entity as NutritionReview, Model as NutritionReviewModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use weight_entry::{
    Column as WeightEntryColumn, Entity as WeightEntry, Model as WeightEntryModel,
};
pub use weight_goal::{
    Column as WeightGoalColumn, Entity as WeightGoal, Model as WeightGoalModel, Phase,
};
