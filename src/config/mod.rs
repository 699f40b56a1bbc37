// src/config/mod.rs
pub mod engine;

pub use engine::{
    ChunkerConfig, DecayConfig, EngineConfig, NormalizerConfig, ScorerConfig, ScorerKind,
    ENV_CONFIG_PATH,
};
