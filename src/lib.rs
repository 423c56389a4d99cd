pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod cover;
pub mod events;
pub mod model;
pub mod poller;
pub mod shuffle;
pub mod ui;
