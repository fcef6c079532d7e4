// Mock-interview sessions: the session aggregate and its store, answer
// analysis, question generation, and the engine that ties them together.

pub mod analysis;
pub mod dashboard;
pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod questions;
pub mod session;
pub mod store;
