pub(crate) mod classes;
pub(crate) mod health;
pub(crate) mod mistakes;
pub(crate) mod recitation_tests;
pub(crate) mod test_mistakes;
pub(crate) mod test_questions;
