//! Glyph atlas: CPU-side texture pages for glyph bitmaps.
//!
//! Each page uses a simple row-based "shelf" packing algorithm. Each row
//! (shelf) has a fixed height determined by the tallest glyph placed on it.
//! When a glyph doesn't fit any shelf of any page, a new page is opened
//! until `max_pages` is reached.
//!
//! Pages store RGBA texels. Every write stamps the page with a fresh
//! revision so the renderer can re-upload only pages that changed.

use std::collections::HashMap;
use std::hash::Hash;

use cosmic_text::CacheKey;

/// A glyph's location in the atlas: the page plus UVs normalized to [0,1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    /// Index of the page holding the glyph.
    pub page: usize,
    /// Top-left U coordinate.
    pub u_min: f32,
    /// Top-left V coordinate.
    pub v_min: f32,
    /// Bottom-right U coordinate.
    pub u_max: f32,
    /// Bottom-right V coordinate.
    pub v_max: f32,
}

/// Pixel layout of a bitmap handed to [`GlyphAtlas::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitmapFormat {
    /// One coverage byte per pixel; stored as white with the coverage as alpha.
    Alpha,
    /// Four bytes per pixel, copied as-is.
    Rgba,
}

impl BitmapFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha => 1,
            Self::Rgba => 4,
        }
    }
}

/// Pixel-space rectangle within a page.
#[derive(Clone, Copy, Debug)]
struct AtlasRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Shelf (row) in a page.
struct Shelf {
    /// Y offset of this shelf.
    y: u32,
    /// Height of this shelf (tallest glyph placed on it).
    height: u32,
    /// Next free X position.
    cursor_x: u32,
}

/// One square RGBA texture page.
pub struct AtlasPage {
    size: u32,
    data: Vec<u8>,
    revision: u64,
    shelves: Vec<Shelf>,
    padding: u32,
}

impl AtlasPage {
    fn new(size: u32, revision: u64) -> Self {
        let pixel_count = (size as usize) * (size as usize) * 4;
        Self {
            size,
            data: vec![0u8; pixel_count],
            revision,
            shelves: Vec::new(),
            padding: 1,
        }
    }

    /// Width = height of the page in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// RGBA pixel data (size * size * 4 bytes).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Revision stamp of the last write. Unique across the whole atlas.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Allocate a rect using shelf packing.
    fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        let padded_w = width + self.padding;
        let padded_h = height + self.padding;

        if padded_w > self.size || padded_h > self.size {
            return None;
        }

        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.size {
                let rect = AtlasRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(rect);
            }
        }

        let shelf_y = self.shelves.last().map(|s| s.y + s.height).unwrap_or(0);
        if shelf_y + padded_h > self.size {
            return None;
        }

        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });

        Some(AtlasRect {
            x: 0,
            y: shelf_y,
            width,
            height,
        })
    }

    fn blit(&mut self, rect: &AtlasRect, bitmap: &[u8], format: BitmapFormat) {
        let bpp = format.bytes_per_pixel();
        for row in 0..rect.height {
            for col in 0..rect.width {
                let src = ((row * rect.width + col) as usize) * bpp;
                let dst = (((rect.y + row) * self.size + rect.x + col) as usize) * 4;
                if src + bpp > bitmap.len() || dst + 4 > self.data.len() {
                    continue;
                }
                let texel = &mut self.data[dst..dst + 4];
                match format {
                    BitmapFormat::Alpha => texel.copy_from_slice(&[255, 255, 255, bitmap[src]]),
                    BitmapFormat::Rgba => texel.copy_from_slice(&bitmap[src..src + 4]),
                }
            }
        }
    }

    fn region(&self, page: usize, rect: &AtlasRect) -> AtlasRegion {
        let inv = 1.0 / self.size as f32;
        AtlasRegion {
            page,
            u_min: rect.x as f32 * inv,
            v_min: rect.y as f32 * inv,
            u_max: (rect.x + rect.width) as f32 * inv,
            v_max: (rect.y + rect.height) as f32 * inv,
        }
    }
}

/// Multi-page glyph atlas keyed by the shaper's glyph cache key.
pub struct GlyphAtlas<K = CacheKey> {
    page_size: u32,
    max_pages: usize,
    pages: Vec<AtlasPage>,
    entries: HashMap<K, AtlasRegion>,
    next_revision: u64,
    epoch: u64,
}

impl<K: Eq + Hash + Copy> GlyphAtlas<K> {
    pub const DEFAULT_PAGE_SIZE: u32 = 1024;
    pub const DEFAULT_MAX_PAGES: usize = 4;

    /// Create an empty atlas. Pages are allocated lazily.
    pub fn new(page_size: u32, max_pages: usize) -> Self {
        Self {
            page_size,
            max_pages: max_pages.max(1),
            pages: Vec::new(),
            entries: HashMap::new(),
            next_revision: 1,
            epoch: 0,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of glyphs currently stored.
    pub fn glyph_count(&self) -> usize {
        self.entries.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&AtlasPage> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    /// Bumped by [`clear`](Self::clear); regions handed out under an older
    /// epoch are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Look up a previously-inserted glyph.
    pub fn get(&self, key: &K) -> Option<AtlasRegion> {
        self.entries.get(key).copied()
    }

    /// Insert a glyph bitmap, returning its region.
    ///
    /// Returns the cached region when `key` is already present, and `None`
    /// when the glyph is larger than a page or every page is full.
    pub fn insert(
        &mut self,
        key: K,
        width: u32,
        height: u32,
        bitmap: &[u8],
        format: BitmapFormat,
    ) -> Option<AtlasRegion> {
        if let Some(region) = self.get(&key) {
            return Some(region);
        }

        let (page_index, rect) = self.allocate(width, height)?;
        let revision = self.bump_revision();
        let page = &mut self.pages[page_index];
        page.blit(&rect, bitmap, format);
        page.revision = revision;

        let region = page.region(page_index, &rect);
        self.entries.insert(key, region);
        Some(region)
    }

    /// Drop every glyph and page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.entries.clear();
        self.epoch += 1;
    }

    fn allocate(&mut self, width: u32, height: u32) -> Option<(usize, AtlasRect)> {
        for (index, page) in self.pages.iter_mut().enumerate() {
            if let Some(rect) = page.allocate(width, height) {
                return Some((index, rect));
            }
        }

        if self.pages.len() >= self.max_pages {
            return None;
        }

        let revision = self.bump_revision();
        let mut page = AtlasPage::new(self.page_size, revision);
        let rect = page.allocate(width, height)?;
        log::debug!("glyph atlas: opened page {} ({}px)", self.pages.len(), self.page_size);
        self.pages.push(page);
        Some((self.pages.len() - 1, rect))
    }

    fn bump_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE, Self::DEFAULT_MAX_PAGES)
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas(size: u32, pages: usize) -> GlyphAtlas<u16> {
        GlyphAtlas::new(size, pages)
    }

    #[test]
    fn test_atlas_starts_without_pages() {
        let atlas = atlas(256, 2);
        assert_eq!(atlas.page_count(), 0);
        assert_eq!(atlas.glyph_count(), 0);
        assert_eq!(atlas.page_size(), 256);
    }

    #[test]
    fn test_insert_single_glyph() {
        let mut atlas = atlas(256, 1);
        let bitmap = vec![255u8; 8 * 8];
        let r = atlas.insert(1, 8, 8, &bitmap, BitmapFormat::Alpha).unwrap();
        assert_eq!(atlas.glyph_count(), 1);
        assert_eq!(atlas.page_count(), 1);
        assert_eq!(atlas.page(0).unwrap().data().len(), 256 * 256 * 4);
        assert_eq!(r.page, 0);
        assert!(r.u_min >= 0.0 && r.u_min < r.u_max && r.u_max <= 1.0);
        assert!(r.v_min >= 0.0 && r.v_min < r.v_max && r.v_max <= 1.0);
    }

    #[test]
    fn test_insert_duplicate_returns_cached() {
        let mut atlas = atlas(256, 1);
        let bitmap = vec![128u8; 10 * 10];
        let r1 = atlas.insert(42, 10, 10, &bitmap, BitmapFormat::Alpha).unwrap();
        let revision = atlas.page(0).unwrap().revision();
        let r2 = atlas.insert(42, 10, 10, &bitmap, BitmapFormat::Alpha).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(atlas.glyph_count(), 1);
        assert_eq!(atlas.page(0).unwrap().revision(), revision);
    }

    #[test]
    fn test_alpha_bitmap_expands_to_white() {
        let mut atlas = atlas(64, 1);
        atlas.insert(3, 1, 1, &[77], BitmapFormat::Alpha).unwrap();
        assert_eq!(&atlas.page(0).unwrap().data()[..4], &[255, 255, 255, 77]);
    }

    #[test]
    fn test_rgba_bitmap_blit() {
        let mut atlas = atlas(64, 1);
        let bitmap = vec![
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255, //
            255, 255, 0, 255,
        ];
        atlas.insert(10, 2, 2, &bitmap, BitmapFormat::Rgba).unwrap();
        let data = atlas.page(0).unwrap().data();
        assert_eq!(&data[..8], &bitmap[..8]);
        // Second row starts one page-width later.
        let row = 64 * 4;
        assert_eq!(&data[row..row + 8], &bitmap[8..]);
    }

    #[test]
    fn test_full_page_opens_new_page() {
        // 30x30 + 1px padding: 2 per row, 2 rows → 4 per page.
        let mut atlas = atlas(64, 2);
        let bitmap = vec![255u8; 30 * 30];
        for id in 1..=4 {
            let r = atlas.insert(id, 30, 30, &bitmap, BitmapFormat::Alpha).unwrap();
            assert_eq!(r.page, 0);
        }
        let fifth = atlas.insert(5, 30, 30, &bitmap, BitmapFormat::Alpha).unwrap();
        assert_eq!(fifth.page, 1);
        assert_eq!(atlas.page_count(), 2);
    }

    #[test]
    fn test_all_pages_full_returns_none() {
        let mut atlas = atlas(64, 1);
        let bitmap = vec![255u8; 30 * 30];
        for id in 1..=4 {
            assert!(atlas.insert(id, 30, 30, &bitmap, BitmapFormat::Alpha).is_some());
        }
        assert!(atlas.insert(5, 30, 30, &bitmap, BitmapFormat::Alpha).is_none());
    }

    #[test]
    fn test_glyph_larger_than_page_rejected() {
        let mut atlas = atlas(16, 4);
        let bitmap = vec![255u8; 20 * 20];
        assert!(atlas.insert(1, 20, 20, &bitmap, BitmapFormat::Alpha).is_none());
        assert_eq!(atlas.page_count(), 0);
    }

    #[test]
    fn test_revisions_increase_on_write() {
        let mut atlas = atlas(128, 1);
        let bitmap = vec![255u8; 4 * 4];
        atlas.insert(1, 4, 4, &bitmap, BitmapFormat::Alpha).unwrap();
        let first = atlas.page(0).unwrap().revision();
        atlas.insert(2, 4, 4, &bitmap, BitmapFormat::Alpha).unwrap();
        assert!(atlas.page(0).unwrap().revision() > first);
    }

    #[test]
    fn test_clear_bumps_epoch_and_keeps_revisions_unique() {
        let mut atlas = atlas(128, 1);
        let bitmap = vec![255u8; 4 * 4];
        atlas.insert(1, 4, 4, &bitmap, BitmapFormat::Alpha).unwrap();
        let before = atlas.page(0).unwrap().revision();

        atlas.clear();
        assert_eq!(atlas.epoch(), 1);
        assert_eq!(atlas.page_count(), 0);
        assert!(atlas.get(&1).is_none());

        atlas.insert(1, 4, 4, &bitmap, BitmapFormat::Alpha).unwrap();
        assert!(atlas.page(0).unwrap().revision() > before);
    }

    #[test]
    fn test_shelf_packing_fills_rows() {
        let mut atlas = atlas(128, 1);
        let bitmap = vec![128u8; 10 * 10];
        for id in 0..11u16 {
            assert!(atlas.insert(id, 10, 10, &bitmap, BitmapFormat::Alpha).is_some());
        }
        // 11 * 11 = 121 < 128: one shelf.
        assert_eq!(atlas.page(0).unwrap().shelves.len(), 1);

        atlas.insert(11, 10, 10, &bitmap, BitmapFormat::Alpha).unwrap();
        assert_eq!(atlas.page(0).unwrap().shelves.len(), 2);
    }
}
