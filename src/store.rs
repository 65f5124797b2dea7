//! Stroke Store
//!
//! Holds the committed ("permanent") strokes in drawing order. Append-only,
//! apart from a bulk clear.

use crate::stroke::Stroke;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed stroke at the end
    pub fn append(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
        log::debug!("Stroke stored ({} total)", self.strokes.len());
    }

    /// Remove every stroke
    ///
    /// The caller is responsible for the follow-up full redraw.
    pub fn clear(&mut self) {
        if !self.strokes.is_empty() {
            log::info!("Clearing {} stored strokes", self.strokes.len());
        }
        self.strokes.clear();
    }

    /// Strokes in store order; can be called again for a fresh pass
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.strokes.iter()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Total number of points across all strokes (cost of a full redraw)
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }
}

impl<'a> IntoIterator for &'a StrokeStore {
    type Item = &'a Stroke;
    type IntoIter = std::slice::Iter<'a, Stroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.strokes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn stroke(n: usize) -> Stroke {
        Stroke::from_points((0..n).map(|i| Point::new(i as f32, 0.0)).collect()).unwrap()
    }

    #[test]
    fn append_preserves_order() {
        let mut store = StrokeStore::new();
        store.append(stroke(2));
        store.append(stroke(3));
        let lengths: Vec<usize> = store.iter().map(Stroke::len).collect();
        assert_eq!(lengths, vec![2, 3]);
        assert_eq!(store.point_count(), 5);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut store = StrokeStore::new();
        store.append(stroke(4));
        assert_eq!(store.iter().count(), 1);
        assert_eq!(store.iter().count(), 1);
        assert_eq!((&store).into_iter().count(), 1);
    }

    #[test]
    fn clear_empties_store() {
        let mut store = StrokeStore::new();
        store.append(stroke(2));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.iter().count(), 0);
    }
}
