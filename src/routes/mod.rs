pub(crate) mod dashboard;
pub(crate) mod health;
pub(crate) mod market;
