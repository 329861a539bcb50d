pub mod favorite;
pub mod film;
pub mod session;
pub mod user;
