pub mod features;
pub mod settings;
pub mod users;
