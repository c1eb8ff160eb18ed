//! Per-frame draw submission queue.
//!
//! Submitting records a mesh handle and its world transform; nothing is
//! drawn until the pipeline replays the queue during its passes. Submission
//! order is preserved so draws replay deterministically.

use crate::foundation::math::Mat4;
use crate::render::resources::MeshHandle;

/// One recorded draw request.
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    /// Mesh to draw.
    pub mesh: MeshHandle,
    /// World transform at submission time.
    pub transform: Mat4,
}

/// Order-preserving list of this frame's submissions.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    submissions: Vec<Submission>,
}

impl SubmissionQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the previous frame's submissions.
    pub fn begin_frame(&mut self) {
        self.submissions.clear();
    }

    /// Record a draw request.
    pub fn push(&mut self, mesh: MeshHandle, transform: Mat4) {
        self.submissions.push(Submission { mesh, transform });
    }

    /// Submissions in the order they were pushed.
    #[must_use]
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Number of recorded submissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    /// Whether the queue holds no submissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}
