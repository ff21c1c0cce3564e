//! Error types for the GPU drawing pipeline
//!
//! Shader compile/link failure is the only fatal class: the enclosing draw
//! does not complete and the error propagates to the caller. Everything
//! else the original surface tolerated (pop underflow, unsupported calls)
//! is a defined no-op, not an error.

use thiserror::Error;

/// Errors raised by a render backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,
    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),
    #[error("pixel read-back failed: {0}")]
    ReadBack(String),
}

/// Errors surfaced by the canvas drawing API.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}
