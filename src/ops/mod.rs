pub mod history;
pub mod listing;
pub mod marks;
pub mod session;
