//! Client library of the study platform: the data model, the gamification
//! rules and the session that keeps a local snapshot in step with the hosted
//! store.

pub mod achievements;
pub mod backend;
pub mod case_study;
pub mod config;
pub mod data;
pub mod error;
pub mod generator;
pub mod listing;
pub mod notebooks;
pub mod platform;
pub mod quiz;
pub mod raw_data;
pub mod remote;
pub mod rest;
pub mod schedule;
pub mod votes;

pub use error::{Error, Result};
