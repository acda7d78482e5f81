use std::path::Path;

use crate::error::{Error, Result};

/// File magic: "INKTAG", NUL, format version 1.
const MAGIC: [u8; 8] = *b"INKTAG\0\x01";

/// Header size: 8 bytes magic + 4 bytes row count + 4 bytes dimension.
const HEADER_SIZE: usize = 16;

/// Flat inner-product similarity index over the tag vocabulary.
///
/// Rows are L2-normalized embedding vectors stored in insertion order, so row
/// `i` corresponds to entry `i` of the tag-list sidecar and inner product
/// equals cosine similarity. The index is built once offline and is read-only
/// at query time.
///
/// Binary file format (little-endian):
/// - 8 bytes: magic + version
/// - 4 bytes: row count N (u32 LE)
/// - 4 bytes: dimension D (u32 LE)
/// - N * D * 4 bytes: f32 LE values in row-major order
#[derive(Debug, Clone)]
pub struct TagIndex {
    dimension: usize,
    data: Vec<f32>,
}

/// A single search hit: a row position and its inner-product score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

impl TagIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a vector as the next row. Positions are assigned in insertion
    /// order and never reordered afterwards.
    pub fn add(&mut self, vector: &[f32]) {
        assert_eq!(
            vector.len(),
            self.dimension,
            "vector length must equal the index dimension"
        );
        self.data.extend_from_slice(vector);
    }

    /// The vector stored at `position`.
    pub fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Exact top-k search by inner product, highest score first.
    ///
    /// Returns at most `k` hits and never more than `len()`; every returned
    /// position is a valid row, so no "missing neighbor" sentinel can appear.
    /// Equal scores order by ascending position, which keeps results stable
    /// for identical inputs.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut hits: Vec<Neighbor> = (0..self.len())
            .map(|position| Neighbor {
                position,
                score: dot(self.row(position), query),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        hits
    }

    /// Write the index to `path`, replacing any previous file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));

        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read an index previously written with [`TagIndex::write_to`].
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;

        if bytes.len() < HEADER_SIZE || bytes[0..8] != MAGIC {
            return Err(Error::Config(format!(
                "not a tag index file: {}",
                path.display()
            )));
        }

        let rows = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let dimension = u32::from_le_bytes(bytes[12..16].try_into().unwrap());

        let expected_len =
            HEADER_SIZE + (rows as usize) * (dimension as usize) * 4;
        if bytes.len() != expected_len {
            return Err(Error::Config(format!(
                "truncated tag index file: {}",
                path.display()
            )));
        }

        // pod_collect_to_vec copies, so the byte buffer's alignment is
        // irrelevant.
        let data: Vec<f32> =
            bytemuck::pod_collect_to_vec(&bytes[HEADER_SIZE..]);

        Ok(Self {
            dimension: dimension as usize,
            data,
        })
    }
}

/// L2-normalize a vector in place so inner product equals cosine similarity.
/// A zero vector is left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dimension: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn add_and_row_access() {
        let mut index = TagIndex::new(3);
        index.add(&[1.0, 0.0, 0.0]);
        index.add(&[0.0, 1.0, 0.0]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.row(0), &[1.0, 0.0, 0.0]);
        assert_eq!(index.row(1), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn search_ranks_by_inner_product() {
        let mut index = TagIndex::new(3);
        index.add(&unit(3, 0));
        index.add(&unit(3, 1));
        index.add(&unit(3, 2));

        let mut query = vec![0.9, 0.4, 0.1];
        l2_normalize(&mut query);

        let hits = index.search(&query, 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
        assert_eq!(hits[2].position, 2);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
    }

    #[test]
    fn search_with_k_beyond_len_returns_only_valid_positions() {
        let mut index = TagIndex::new(2);
        index.add(&unit(2, 0));
        index.add(&unit(2, 1));

        let hits = index.search(&[1.0, 0.0], 8);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.position < index.len()));
    }

    #[test]
    fn search_breaks_ties_by_position() {
        let mut index = TagIndex::new(2);
        // Identical rows score identically against any query.
        index.add(&[0.0, 1.0]);
        index.add(&[1.0, 0.0]);
        index.add(&[1.0, 0.0]);

        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].position, 1);
        assert_eq!(hits[1].position, 2);
    }

    #[test]
    fn exact_stored_vector_is_its_own_top_hit() {
        let mut index = TagIndex::new(4);
        for axis in 0..4 {
            index.add(&unit(4, axis));
        }

        for axis in 0..4 {
            let hits = index.search(&unit(4, axis), 1);
            assert_eq!(hits[0].position, axis);
        }
    }

    #[test]
    fn normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut once = vec![0.2, -1.5, 3.0];
        l2_normalize(&mut once);
        let mut twice = once.clone();
        l2_normalize(&mut twice);

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_leaves_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn roundtrip_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tags.index");

        let mut index = TagIndex::new(3);
        index.add(&[1.0, 2.0, 3.0]);
        index.add(&[-0.5, 0.0, 0.25]);
        index.write_to(&path).unwrap();

        let loaded = TagIndex::read_from(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.row(0), index.row(0));
        assert_eq!(loaded.row(1), index.row(1));
    }

    #[test]
    fn write_replaces_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tags.index");

        let mut first = TagIndex::new(2);
        first.add(&[1.0, 0.0]);
        first.add(&[0.0, 1.0]);
        first.write_to(&path).unwrap();

        let mut second = TagIndex::new(2);
        second.add(&[0.5, 0.5]);
        second.write_to(&path).unwrap();

        let loaded = TagIndex::read_from(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.row(0), &[0.5, 0.5]);
    }

    #[test]
    fn read_rejects_foreign_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tags.index");
        std::fs::write(&path, b"definitely not an index").unwrap();

        assert!(matches!(
            TagIndex::read_from(&path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn read_rejects_truncated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tags.index");

        let mut index = TagIndex::new(3);
        index.add(&[1.0, 2.0, 3.0]);
        index.write_to(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            TagIndex::read_from(&path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    #[should_panic(expected = "vector length must equal the index dimension")]
    fn add_wrong_length_panics() {
        let mut index = TagIndex::new(3);
        index.add(&[1.0, 2.0]);
    }
}
