pub(crate) mod classes;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod mistakes;
pub(crate) mod recitation;
pub(crate) mod router;
pub(crate) mod validation;
