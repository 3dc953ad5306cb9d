//! Script evaluation for reaction pipelines.
//!
//! A decision script runs after the entry point of a reaction and after
//! every step. It sees the triggering event and the previous step's output
//! and decides which step, if any, runs next.

pub mod engine;
pub mod error;
pub mod lua;

pub use engine::{Decision, ScriptEngine};
pub use error::ScriptError;
pub use lua::LuaScriptEngine;
