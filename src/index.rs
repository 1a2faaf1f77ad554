//! Spatial indexing of line segments.
//!
//! Uses an R-tree over segment bounding boxes. The index is rebuilt for every
//! comparison; tile-local data volumes keep that cheap, and nothing is ever
//! inserted or removed after the bulk load.

use geo::{BoundingRect, MultiLineString};
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::segmentize;
use crate::{Bounds, Segment};

/// A segment with its position in the indexed line, for R-tree queries.
#[derive(Debug, Clone, Copy)]
pub struct IndexedSegment {
    pub idx: usize,
    pub segment: Segment,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let rect = self.segment.bounding_rect();
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    }
}

/// R-tree over the segments of one reference line.
#[derive(Debug)]
pub struct SegmentIndex {
    tree: RTree<IndexedSegment>,
}

impl SegmentIndex {
    /// Bulk-load an index from segments.
    pub fn new(segments: &[Segment]) -> Self {
        let indexed: Vec<IndexedSegment> = segments
            .iter()
            .enumerate()
            .map(|(idx, segment)| IndexedSegment { idx, segment: *segment })
            .collect();

        Self { tree: RTree::bulk_load(indexed) }
    }

    /// Index every segment of a (multi-)line.
    pub fn from_lines(lines: &MultiLineString<f64>) -> Self {
        Self::new(&segmentize(lines))
    }

    /// Number of indexed segments.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// All segments whose bounding box intersects `query`.
    ///
    /// This is a candidate superset: exact overlap is decided by the classifier.
    /// Results come back in the order the segments were indexed.
    pub fn search(&self, query: &Bounds) -> Vec<&Segment> {
        let mut hits: Vec<&IndexedSegment> =
            self.tree.locate_in_envelope_intersecting(&query.envelope()).collect();
        hits.sort_unstable_by_key(|hit| hit.idx);
        hits.into_iter().map(|hit| &hit.segment).collect()
    }
}
