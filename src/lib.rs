pub mod analyzer;
pub mod config;
pub mod decision_engine;
pub mod domain_utils;
pub mod features;
pub mod history;
pub mod mail;
pub mod oracles;
pub mod overrides;
pub mod signal;
pub mod verdict;

pub use analyzer::{AnalysisResult, Analyzer};
pub use config::Config;
pub use mail::EmailData;
pub use signal::{Severity, Signal};
pub use verdict::Verdict;
