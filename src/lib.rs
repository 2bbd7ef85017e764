pub mod config;
pub mod consts;
pub mod display;
pub mod endpoint;
pub mod events;
pub mod form;
pub mod handler;
