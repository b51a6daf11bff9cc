pub mod assets;
pub mod audio;
pub mod cli;
pub mod combat;
pub mod decor;
pub mod engine;
pub mod entities;
pub mod input;
pub mod menu;
pub mod physics;
pub mod player;
pub mod project_config;
pub mod projects;
pub mod script;
pub mod session;
pub mod showcase;
pub mod storage;
pub mod tasks;
pub mod world;
