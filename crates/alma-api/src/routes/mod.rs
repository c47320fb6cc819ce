pub mod chat;
pub mod health;
pub mod messages;
pub mod permissions;
pub mod providers;
pub mod settings;
pub mod threads;
pub mod workspaces;
