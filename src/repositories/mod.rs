pub(crate) mod attempts;
pub(crate) mod health;
pub(crate) mod sessions;
pub(crate) mod students;
pub(crate) mod tests;
pub(crate) mod users;
