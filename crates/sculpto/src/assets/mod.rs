//! Asset loading utilities.
//!
//! Shader source files hold several pipeline stages in one text, separated
//! by preprocessor lexemes; [`shader_preprocessor`] splits and expands them
//! into per-stage sources ready for the backend compiler.

pub mod shader_preprocessor;

pub use shader_preprocessor::{preprocess_shader, AssetError, StageSource};
