//! One function per table operation. Each wraps a single PostgREST request
//! and normalizes the rows into the types in [`crate::models`].

pub mod exercises;
pub mod profiles;
pub mod training;

pub const PROFILES_TABLE: &str = "profiles";
pub const EXERCISES_TABLE: &str = "exercises";
pub const TRAINING_PLANS_TABLE: &str = "new_training_plans";
