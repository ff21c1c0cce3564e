//! Path accumulation
//!
//! Paths are recorded but never rasterized: the draw pipeline consumes the
//! subpath list for bookkeeping only, and path-based fill/stroke are
//! defined no-ops at the canvas layer. This is a pure data accumulator.

/// One polyline of a path: an ordered point list plus a closed flag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubPath {
    pub points: Vec<(f32, f32)>,
    pub closed: bool,
}

impl SubPath {
    fn starting_at(x: f32, y: f32) -> Self {
        Self {
            points: vec![(x, y)],
            closed: false,
        }
    }
}

/// The ordered subpath list built by `beginPath`/`moveTo`/`lineTo`/
/// `closePath`/`rect`.
#[derive(Clone, Debug, Default)]
pub struct PathState {
    subpaths: Vec<SubPath>,
}

impl PathState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.points.is_empty())
    }

    /// Drop all recorded subpaths (`beginPath`).
    pub fn begin(&mut self) {
        self.subpaths.clear();
    }

    /// Start a new subpath at `(x, y)`.
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.subpaths.push(SubPath::starting_at(x, y));
    }

    /// Append a point to the current subpath; with no subpath yet this
    /// acts as `move_to`, matching canvas behavior.
    pub fn line_to(&mut self, x: f32, y: f32) {
        match self.subpaths.last_mut() {
            Some(last) if !last.points.is_empty() => last.points.push((x, y)),
            _ => self.move_to(x, y),
        }
    }

    /// Close the current subpath and open a new one at its first point.
    ///
    /// Closing an empty or missing subpath is a no-op.
    pub fn close(&mut self) {
        let Some(last) = self.subpaths.last_mut() else {
            return;
        };
        let Some(&first) = last.points.first() else {
            return;
        };
        last.closed = true;
        self.subpaths.push(SubPath::starting_at(first.0, first.1));
    }

    /// Append one closed rectangular subpath, then open a new subpath at
    /// the rectangle's origin (canvas `rect()` semantics).
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.subpaths.push(SubPath {
            points: vec![(x, y), (x + width, y), (x + width, y + height), (x, y + height)],
            closed: true,
        });
        self.subpaths.push(SubPath::starting_at(x, y));
    }
}
