//! Program pool keyed by transform-stack depth
//!
//! Depths requested by the draw pipeline are `stack.len() + 1`, so a
//! typical session touches only a handful of distinct depths. Entries are
//! never evicted; they live as long as the owning canvas.

use rustc_hash::FxHashMap;

use crate::backend::{ProgramId, RenderBackend};
use crate::error::BackendError;
use crate::shaders::ProgramDescriptor;

/// Compile-once cache of depth-specialized programs.
#[derive(Debug, Default)]
pub struct ProgramPool {
    programs: FxHashMap<usize, ProgramId>,
}

impl ProgramPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct depths compiled so far.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn contains_depth(&self, depth: usize) -> bool {
        self.programs.contains_key(&depth)
    }

    /// Return the cached program for `depth`, compiling it on first use.
    ///
    /// A compile failure propagates and caches nothing, so a later call
    /// retries rather than handing out a dead handle.
    pub fn get_or_compile<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        depth: usize,
    ) -> Result<ProgramId, BackendError> {
        if let Some(&program) = self.programs.get(&depth) {
            return Ok(program);
        }
        tracing::debug!(depth, "compiling canvas program");
        let program = backend.compile_program(&ProgramDescriptor::for_depth(depth))?;
        self.programs.insert(depth, program);
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn test_compiles_once_per_depth() {
        let mut backend = RecordingBackend::new(100, 100);
        let mut pool = ProgramPool::new();

        let a = pool.get_or_compile(&mut backend, 2).unwrap();
        let b = pool.get_or_compile(&mut backend, 2).unwrap();
        let c = pool.get_or_compile(&mut backend, 3).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(backend.compiled_depths(), &[2, 3]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_failure_caches_nothing() {
        let mut backend = RecordingBackend::new(100, 100);
        let mut pool = ProgramPool::new();

        backend.fail_next_compile();
        assert!(pool.get_or_compile(&mut backend, 2).is_err());
        assert!(!pool.contains_depth(2));

        // A later request succeeds and compiles fresh.
        let program = pool.get_or_compile(&mut backend, 2).unwrap();
        assert_eq!(backend.compiled_depths(), &[2]);
        assert!(pool.contains_depth(2));
        let again = pool.get_or_compile(&mut backend, 2).unwrap();
        assert_eq!(program, again);
    }
}
