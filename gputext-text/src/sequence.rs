//! Draw sequences: the engine's per-page glyph geometry.
//!
//! A [`DrawSequence`] is a run of vertices and indices that all sample the
//! same atlas page. Positions and texture coordinates are read through
//! strided views into one float array, so producers may interleave them or
//! keep them apart. Sequences of one text object form a forward-only chain
//! through [`DrawSequence::next`].

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SequenceError {
    #[error("{attribute} stride {stride} is smaller than 2 floats")]
    StrideTooSmall { attribute: &'static str, stride: usize },
    #[error("{attribute} reads past the end of the float data ({needed} > {len})")]
    DataTooShort {
        attribute: &'static str,
        needed: usize,
        len: usize,
    },
    #[error("{attribute} view overflows the address space")]
    StrideOverflow { attribute: &'static str },
    #[error("index {index} at position {position} references no vertex (sequence has {num_vertices})")]
    IndexOutOfRange {
        index: u32,
        position: usize,
        num_vertices: usize,
    },
}

/// Strided view of a 2-float attribute, in units of `f32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stride {
    /// Offset of the first element.
    pub offset: usize,
    /// Distance between consecutive elements (>= 2).
    pub stride: usize,
}

impl Stride {
    pub const fn new(offset: usize, stride: usize) -> Self {
        Self { offset, stride }
    }

    /// Tightly packed `[x, y, x, y, ...]` starting at `offset`.
    pub const fn packed(offset: usize) -> Self {
        Self { offset, stride: 2 }
    }

    fn check(self, attribute: &'static str, num_vertices: usize, len: usize) -> Result<(), SequenceError> {
        if self.stride < 2 {
            return Err(SequenceError::StrideTooSmall {
                attribute,
                stride: self.stride,
            });
        }
        if num_vertices == 0 {
            return Ok(());
        }
        let needed = (num_vertices - 1)
            .checked_mul(self.stride)
            .and_then(|last| last.checked_add(self.offset))
            .and_then(|last| last.checked_add(2))
            .ok_or(SequenceError::StrideOverflow { attribute })?;
        if needed > len {
            return Err(SequenceError::DataTooShort { attribute, needed, len });
        }
        Ok(())
    }

    /// Only called for views that passed [`check`](Self::check), so the
    /// offsets stay below `len`.
    #[inline]
    fn read(self, data: &[f32], i: usize) -> [f32; 2] {
        let at = self.offset + i * self.stride;
        [data[at], data[at + 1]]
    }
}

/// Vertices + indices for one atlas page, linked to the next page's run.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawSequence {
    data: Vec<f32>,
    xy: Stride,
    uv: Stride,
    num_vertices: usize,
    indices: Vec<u32>,
    atlas_page: usize,
    next: Option<Box<DrawSequence>>,
}

impl DrawSequence {
    /// Build a sequence, validating every strided read and index.
    pub fn new(
        data: Vec<f32>,
        xy: Stride,
        uv: Stride,
        num_vertices: usize,
        indices: Vec<u32>,
        atlas_page: usize,
    ) -> Result<Self, SequenceError> {
        xy.check("xy", num_vertices, data.len())?;
        uv.check("uv", num_vertices, data.len())?;

        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= num_vertices)
        {
            return Err(SequenceError::IndexOutOfRange {
                index,
                position,
                num_vertices,
            });
        }

        Ok(Self {
            data,
            xy,
            uv,
            num_vertices,
            indices,
            atlas_page,
            next: None,
        })
    }

    /// Chain `next` after this sequence, replacing any existing tail.
    pub fn with_next(mut self, next: DrawSequence) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    /// Indices, relative to this sequence's first vertex.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn atlas_page(&self) -> usize {
        self.atlas_page
    }

    /// Position of vertex `i`. Panics if `i >= num_vertices()`.
    #[inline]
    pub fn xy(&self, i: usize) -> [f32; 2] {
        assert!(i < self.num_vertices, "vertex {i} out of range");
        self.xy.read(&self.data, i)
    }

    /// Texture coordinate of vertex `i`. Panics if `i >= num_vertices()`.
    #[inline]
    pub fn uv(&self, i: usize) -> [f32; 2] {
        assert!(i < self.num_vertices, "vertex {i} out of range");
        self.uv.read(&self.data, i)
    }

    pub fn next(&self) -> Option<&DrawSequence> {
        self.next.as_deref()
    }

    /// Iterate this sequence and every sequence chained after it.
    pub fn iter(&self) -> Sequences<'_> {
        Sequences { current: Some(self) }
    }

    /// Totals over the whole chain: `(vertices, indices)`.
    pub fn chain_totals(&self) -> (usize, usize) {
        self.iter()
            .fold((0, 0), |(v, i), s| (v + s.num_vertices, i + s.indices.len()))
    }
}

impl<'a> IntoIterator for &'a DrawSequence {
    type Item = &'a DrawSequence;
    type IntoIter = Sequences<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a sequence chain.
pub struct Sequences<'a> {
    current: Option<&'a DrawSequence>,
}

impl<'a> Iterator for Sequences<'a> {
    type Item = &'a DrawSequence;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = current.next();
        Some(current)
    }
}

/// Accumulates glyph quads for one atlas page.
///
/// Vertices are interleaved as `[x, y, u, v]`; each quad adds the corners
/// top-left, top-right, bottom-right, bottom-left and the two triangles
/// `0 1 2` / `0 2 3`.
#[derive(Debug, Default)]
pub(crate) struct QuadRun {
    data: Vec<f32>,
    indices: Vec<u32>,
    vertices: u32,
}

impl QuadRun {
    pub(crate) fn push_quad(&mut self, min: [f32; 2], max: [f32; 2], uv_min: [f32; 2], uv_max: [f32; 2]) {
        let base = self.vertices;
        self.data.extend_from_slice(&[
            min[0], min[1], uv_min[0], uv_min[1], //
            max[0], min[1], uv_max[0], uv_min[1], //
            max[0], max[1], uv_max[0], uv_max[1], //
            min[0], max[1], uv_min[0], uv_max[1],
        ]);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        self.vertices += 4;
    }

    pub(crate) fn into_sequence(self, atlas_page: usize) -> DrawSequence {
        DrawSequence {
            data: self.data,
            xy: Stride::new(0, 4),
            uv: Stride::new(2, 4),
            num_vertices: self.vertices as usize,
            indices: self.indices,
            atlas_page,
            next: None,
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
