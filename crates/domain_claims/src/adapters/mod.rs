//! Analysis adapters
//!
//! - [`GeminiAnalyzer`]: Google Gemini `generateContent` over REST
//! - [`HeuristicAnalyzer`]: deterministic local scoring for development

pub mod gemini;
pub mod heuristic;
mod prompts;

pub use gemini::{GeminiAnalyzer, GeminiConfig};
pub use heuristic::HeuristicAnalyzer;
