//! Glyph batching: draw sequences → one vertex/index buffer.
//!
//! A [`GeometryBuffer`] collects every sequence queued during a frame into
//! two flat arrays so the whole frame uploads in one copy and draws with as
//! few indexed calls as there are atlas pages in use.
//!
//! ```text
//!  DrawSequence ─► append() ─► vertices[vertex_count..]  (z = 0, uniform color)
//!                           └► indices[index_count..]    (+ prior vertex_count)
//! ```
//!
//! Counts accumulate across appends, and indices are rebased so each
//! sequence keeps addressing its own vertices.

use std::ops::Range;

use gputext_text::DrawSequence;
use thiserror::Error;

use crate::vertex::Vertex;

/// Vertex capacity used by the demo.
pub const MAX_VERTEX_COUNT: usize = 4000;
/// Index capacity used by the demo.
pub const MAX_INDEX_COUNT: usize = 6000;
/// Largest vertex or index count a `u32` index buffer can address.
pub const MAX_ADDRESSABLE: usize = u32::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Capacity exceeded: {requested} {kind} requested, {available} available")]
    CapacityExceeded {
        kind: &'static str,
        requested: usize,
        available: usize,
    },
}

/// A contiguous index range sampling one atlas page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub atlas_page: usize,
    pub indices: Range<u32>,
}

/// Byte views of a filled buffer, ready for a GPU copy.
#[derive(Clone, Copy, Debug)]
pub struct Upload<'a> {
    pub vertices: &'a [u8],
    pub indices: &'a [u8],
}

/// Fixed-capacity vertex/index storage for one frame of glyphs.
#[derive(Debug)]
pub struct GeometryBuffer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    batches: Vec<Batch>,
    max_vertices: usize,
    max_indices: usize,
}

impl GeometryBuffer {
    /// Buffer with the default 4000 vertex / 6000 index capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_VERTEX_COUNT, MAX_INDEX_COUNT)
    }

    /// Capacities are clamped to [`MAX_ADDRESSABLE`] since vertices are
    /// addressed with `u32` indices. Storage beyond the default capacity
    /// grows on demand.
    pub fn with_capacity(max_vertices: usize, max_indices: usize) -> Self {
        if max_vertices > MAX_ADDRESSABLE || max_indices > MAX_ADDRESSABLE {
            log::warn!(
                "geometry capacity {max_vertices}/{max_indices} clamped to {MAX_ADDRESSABLE}"
            );
        }
        let max_vertices = max_vertices.min(MAX_ADDRESSABLE);
        let max_indices = max_indices.min(MAX_ADDRESSABLE);
        Self {
            vertices: Vec::with_capacity(max_vertices.min(MAX_VERTEX_COUNT)),
            indices: Vec::with_capacity(max_indices.min(MAX_INDEX_COUNT)),
            batches: Vec::new(),
            max_vertices,
            max_indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    pub fn max_indices(&self) -> usize {
        self.max_indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Index ranges grouped by atlas page, in append order.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Append one sequence with a uniform fill color.
    ///
    /// Returns the index range the sequence occupies. On
    /// [`GeometryError::CapacityExceeded`] nothing is written.
    pub fn append(&mut self, sequence: &DrawSequence, color: [f32; 4]) -> Result<Range<u32>, GeometryError> {
        self.reserve(sequence.num_vertices(), sequence.num_indices())?;
        Ok(self.push(sequence, color))
    }

    /// Append every sequence of the chain starting at `head`.
    ///
    /// All-or-nothing: capacity for the whole chain is checked first.
    pub fn append_chain(&mut self, head: &DrawSequence, color: [f32; 4]) -> Result<Range<u32>, GeometryError> {
        let (vertices, indices) = head.chain_totals();
        self.reserve(vertices, indices)?;

        let start = self.indices.len() as u32;
        for sequence in head {
            self.push(sequence, color);
        }
        Ok(start..self.indices.len() as u32)
    }

    /// Byte views of the filled portion of both arrays.
    pub fn upload(&self) -> Upload<'_> {
        Upload {
            vertices: bytemuck::cast_slice(&self.vertices),
            indices: bytemuck::cast_slice(&self.indices),
        }
    }

    /// Reset counts and batches, keeping the allocation.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
    }

    fn reserve(&self, vertices: usize, indices: usize) -> Result<(), GeometryError> {
        let free_vertices = self.max_vertices - self.vertices.len();
        if vertices > free_vertices {
            return Err(GeometryError::CapacityExceeded {
                kind: "vertices",
                requested: vertices,
                available: free_vertices,
            });
        }
        let free_indices = self.max_indices - self.indices.len();
        if indices > free_indices {
            return Err(GeometryError::CapacityExceeded {
                kind: "indices",
                requested: indices,
                available: free_indices,
            });
        }
        Ok(())
    }

    /// Capacity must already be checked.
    fn push(&mut self, sequence: &DrawSequence, color: [f32; 4]) -> Range<u32> {
        let base = self.vertices.len() as u32;
        let start = self.indices.len() as u32;

        self.vertices.extend(
            (0..sequence.num_vertices()).map(|i| Vertex::new(sequence.xy(i), color, sequence.uv(i))),
        );
        self.indices
            .extend(sequence.indices().iter().map(|&index| base + index));

        let range = start..self.indices.len() as u32;
        if !range.is_empty() {
            self.extend_batches(sequence.atlas_page(), range.clone());
        }
        range
    }

    fn extend_batches(&mut self, atlas_page: usize, range: Range<u32>) {
        match self.batches.last_mut() {
            Some(last) if last.atlas_page == atlas_page && last.indices.end == range.start => {
                last.indices.end = range.end;
            }
            _ => self.batches.push(Batch {
                atlas_page,
                indices: range,
            }),
        }
    }
}

impl Default for GeometryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ===================================================================
// Tests
// ===================================================================
