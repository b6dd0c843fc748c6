#![allow(non_snake_case)]

pub mod browser;
pub mod cli;
pub mod clients;
pub mod config;
pub mod conflict;
pub mod handlers;
pub mod models;
pub mod runtime;
pub mod service;
pub mod time_parse;
