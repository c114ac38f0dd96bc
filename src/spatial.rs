use std::collections::HashMap;

use eframe::egui::Vec2;

/// Uniform grid over node positions, rebuilt wholesale every tick.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    max_rings: i32,
    buckets: HashMap<u64, Vec<(usize, Vec2)>>,
    len: usize,
}

fn cell_key(cell_x: i32, cell_y: i32) -> u64 {
    ((cell_x as u32 as u64) << 32) | (cell_y as u32 as u64)
}

impl SpatialIndex {
    /// `cell_size` must be positive; the engine config validates it.
    pub fn new(cell_size: f32, max_rings: u32) -> Self {
        Self {
            cell_size,
            max_rings: max_rings.min(i32::MAX as u32) as i32,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn occupied_cells(&self) -> usize {
        self.buckets.values().filter(|bucket| !bucket.is_empty()).count()
    }

    fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    pub fn insert(&mut self, index: usize, position: Vec2) {
        if !position.is_finite() {
            return;
        }
        let (cell_x, cell_y) = self.cell_of(position);
        self.buckets
            .entry(cell_key(cell_x, cell_y))
            .or_default()
            .push((index, position));
        self.len += 1;
    }

    /// Replaces the whole index. Slots without a position are skipped.
    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (usize, Option<Vec2>)>,
    {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        self.len = 0;

        for (index, position) in positions {
            if let Some(position) = position {
                self.insert(index, position);
            }
        }

        self.buckets.retain(|_, bucket| !bucket.is_empty());
    }

    fn bucket(&self, cell_x: i32, cell_y: i32) -> &[(usize, Vec2)] {
        self.buckets
            .get(&cell_key(cell_x, cell_y))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Indices within `radius` of `point`, in no particular order.
    pub fn query(&self, point: Vec2, radius: f32) -> Vec<usize> {
        let mut found = Vec::new();
        self.query_into(point, radius, &mut found);
        found
    }

    pub fn query_into(&self, point: Vec2, radius: f32, found: &mut Vec<usize>) {
        found.clear();
        if self.len == 0 || !point.is_finite() || !(radius >= 0.0) {
            return;
        }

        let ring = (radius / self.cell_size).ceil().min(i32::MAX as f32) as i32;
        let radius_sq = radius * radius;
        let (center_x, center_y) = self.cell_of(point);
        for cell_y in center_y.saturating_sub(ring)..=center_y.saturating_add(ring) {
            for cell_x in center_x.saturating_sub(ring)..=center_x.saturating_add(ring) {
                for &(index, position) in self.bucket(cell_x, cell_y) {
                    if (position - point).length_sq() <= radius_sq {
                        found.push(index);
                    }
                }
            }
        }
    }

    /// Expanding-ring search bounded by the configured ring cap. Returns the
    /// closest candidate seen, which is exact whenever it lies within the
    /// fully scanned rings and approximate otherwise.
    pub fn nearest(&self, point: Vec2) -> Option<(usize, f32)> {
        if self.len == 0 || !point.is_finite() {
            return None;
        }

        let (center_x, center_y) = self.cell_of(point);
        let mut best: Option<(usize, f32)> = None;
        for ring in 0..=self.max_rings {
            self.scan_ring(center_x, center_y, ring, point, &mut best);

            let scanned_bound = ring as f32 * self.cell_size;
            if let Some((_, distance_sq)) = best
                && distance_sq.sqrt() <= scanned_bound
            {
                break;
            }
        }

        best.map(|(index, distance_sq)| (index, distance_sq.sqrt()))
    }

    fn scan_ring(
        &self,
        center_x: i32,
        center_y: i32,
        ring: i32,
        point: Vec2,
        best: &mut Option<(usize, f32)>,
    ) {
        let mut visit = |cell_x: i32, cell_y: i32| {
            for &(index, position) in self.bucket(cell_x, cell_y) {
                let distance_sq = (position - point).length_sq();
                if best.is_none_or(|(_, best_sq)| distance_sq < best_sq) {
                    *best = Some((index, distance_sq));
                }
            }
        };

        if ring == 0 {
            visit(center_x, center_y);
            return;
        }

        let (min_x, max_x) = (center_x.saturating_sub(ring), center_x.saturating_add(ring));
        let (min_y, max_y) = (center_y.saturating_sub(ring), center_y.saturating_add(ring));
        for cell_x in min_x..=max_x {
            visit(cell_x, min_y);
            visit(cell_x, max_y);
        }
        for cell_y in (min_y + 1)..max_y {
            visit(min_x, cell_y);
            visit(max_x, cell_y);
        }
    }
}
