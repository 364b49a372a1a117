#![allow(non_snake_case)]
/// error types shared by all modules
pub mod errors;
#[allow(non_snake_case)]
pub mod Kinetics;
#[allow(non_snake_case)]
pub mod ReactorsIVP;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
