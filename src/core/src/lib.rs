pub mod configuration;
pub mod controller;
pub mod distribution;
pub mod error_handling;
pub mod flow;
pub mod name_resolution;
pub mod network;
pub mod session_management;
pub mod web_interface;
