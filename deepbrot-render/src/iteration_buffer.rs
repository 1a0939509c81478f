use deepbrot_core::IterationResult;

/// Stores per-pixel `IterationResult` data for a full frame.
///
/// This is what the headless backend rasterizes instead of colored pixels,
/// so tests can compare frames iteration for iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationBuffer {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub data: Vec<IterationResult>,
}

impl IterationBuffer {
    pub fn new(width: u32, height: u32, max_iterations: u32) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            max_iterations,
            data: vec![IterationResult::Interior; size],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> IterationResult {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: IterationResult) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn interior_count(&self) -> usize {
        self.data
            .iter()
            .filter(|r| matches!(r, IterationResult::Interior))
            .count()
    }

    pub fn escaped_count(&self) -> usize {
        self.data.len() - self.interior_count()
    }

    /// Pixels whose classification differs from `other` by more than
    /// `tolerance` iterations. Buffers of different size never match.
    pub fn mismatches(&self, other: &IterationBuffer, tolerance: u64) -> usize {
        if self.width != other.width || self.height != other.height {
            return self.data.len().max(other.data.len());
        }
        self.data
            .iter()
            .zip(&other.data)
            .filter(|(a, b)| {
                let (a, b) = (a.class(), b.class());
                if a == u64::MAX || b == u64::MAX {
                    a != b
                } else {
                    a.abs_diff(b) > tolerance
                }
            })
            .count()
    }
}
