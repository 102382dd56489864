pub(crate) mod dashboard;
pub(crate) mod health;
pub(crate) mod market;
pub(crate) mod news;
pub(crate) mod notifications;
pub(crate) mod portfolio;
