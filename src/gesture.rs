use crate::model::{CoordinateRecord, Eye, Vertex, SIZE_SCALE};

// ── Gestures ────────────────────────────────────────────────────────────────

/// What a pointer drag is currently editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    /// Moves one vertex vertically.
    Vertex { eye: Eye, vertex: Vertex },
    /// Moves the center; both vertices follow horizontally.
    Center { eye: Eye },
    /// Resizes the eye from its radius handle.
    Resize { eye: Eye },
}

impl Gesture {
    /// Writes the pointer offset (image space) into the record.
    pub fn apply(self, record: &mut CoordinateRecord, pointer: (f32, f32)) {
        let (x, y) = pointer;
        match self {
            Gesture::Vertex { eye, vertex } => record.set_vertex_y(eye, vertex, y),
            Gesture::Center { eye } => record.move_center(eye, x, y),
            Gesture::Resize { eye } => {
                let center_x = record.eye(eye).center.0;
                record.set_size(eye, resized_diameter(center_x, x));
            }
        }
    }
}

/// Diameter units for a radius handle dragged to `pointer_x`.
pub fn resized_diameter(center_x: f32, pointer_x: f32) -> f32 {
    (center_x - pointer_x).abs() / SIZE_SCALE * 2.0
}

/// Tracks the single live drag gesture.
#[derive(Debug, Default)]
pub struct GestureController {
    active: Option<Gesture>,
}

impl GestureController {
    pub fn active(&self) -> Option<Gesture> {
        self.active
    }

    /// Starts `gesture`, dropping whatever was active before.
    pub fn begin(&mut self, gesture: Gesture) {
        if let Some(prev) = self.active.replace(gesture) {
            log::debug!("gesture {prev:?} cancelled by {gesture:?}");
        }
    }

    /// Applies a pointer move. Returns true if the record changed.
    pub fn pointer_moved(&self, record: &mut CoordinateRecord, pointer: (f32, f32)) -> bool {
        match self.active {
            Some(gesture) => {
                gesture.apply(record, pointer);
                true
            }
            None => false,
        }
    }

    /// Pointer-up: ends any gesture.
    pub fn end(&mut self) {
        self.active = None;
    }
}

// ── Hit testing ─────────────────────────────────────────────────────────────

/// Image-space position of every drag handle in the record.
pub fn handles(record: &CoordinateRecord) -> Vec<(Gesture, (f32, f32))> {
    let mut out = Vec::with_capacity(8);
    for eye in Eye::BOTH {
        let l = record.eye(eye);
        out.push((Gesture::Vertex { eye, vertex: Vertex::Top }, l.top));
        out.push((Gesture::Center { eye }, l.center));
        out.push((Gesture::Vertex { eye, vertex: Vertex::Bottom }, l.bottom));
        out.push((Gesture::Resize { eye }, (l.center.0 + l.radius(), l.center.1)));
    }
    out
}

/// Nearest handle within `max_dist` of `pos`, in image space.
pub fn hit_test(record: &CoordinateRecord, pos: (f32, f32), max_dist: f32) -> Option<Gesture> {
    handles(record)
        .into_iter()
        .map(|(gesture, (hx, hy))| {
            let d = ((hx - pos.0).powi(2) + (hy - pos.1).powi(2)).sqrt();
            (gesture, d)
        })
        .filter(|(_, d)| *d <= max_dist)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(gesture, _)| gesture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_record;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_resize_from_pointer() {
        let mut record = sample_record();
        record.move_center(Eye::Right, 100.0, 60.0);
        Gesture::Resize { eye: Eye::Right }.apply(&mut record, (130.0, 0.0));
        assert_approx_eq!(record.eye(Eye::Right).size, 4.2857, 1e-3);

        // the left side of the center gives the same size
        Gesture::Resize { eye: Eye::Right }.apply(&mut record, (70.0, 0.0));
        assert_approx_eq!(record.eye(Eye::Right).size, 4.2857, 1e-3);
    }

    #[test]
    fn test_vertex_uses_vertical_offset() {
        let mut record = sample_record();
        Gesture::Vertex { eye: Eye::Left, vertex: Vertex::Top }.apply(&mut record, (5.0, 75.0));
        assert_eq!(record.eye(Eye::Left).top, (300.0, 75.0));
    }

    #[test]
    fn test_center_moves_vertices_x() {
        let mut record = sample_record();
        Gesture::Center { eye: Eye::Left }.apply(&mut record, (310.0, 70.0));
        let os = record.eye(Eye::Left);
        assert_eq!(os.center, (310.0, 70.0));
        assert_eq!(os.top.0, 310.0);
        assert_eq!(os.bottom.0, 310.0);
        assert_eq!(os.top.1, 42.0);
    }

    #[test]
    fn test_begin_replaces_active_gesture() {
        let mut controller = GestureController::default();
        controller.begin(Gesture::Center { eye: Eye::Right });
        controller.begin(Gesture::Resize { eye: Eye::Left });
        assert_eq!(controller.active(), Some(Gesture::Resize { eye: Eye::Left }));

        let mut record = sample_record();
        let right_before = record.eye(Eye::Right);
        assert!(controller.pointer_moved(&mut record, (0.0, 0.0)));
        assert_eq!(record.eye(Eye::Right), right_before);
    }

    #[test]
    fn test_moves_after_end_are_ignored() {
        let mut controller = GestureController::default();
        controller.begin(Gesture::Vertex { eye: Eye::Right, vertex: Vertex::Bottom });
        controller.end();
        assert_eq!(controller.active(), None);

        let mut record = sample_record();
        assert!(!controller.pointer_moved(&mut record, (1.0, 1.0)));
        assert_eq!(record, sample_record());

        // ending twice is harmless
        controller.end();
    }

    #[test]
    fn test_hit_test_picks_nearest_handle() {
        let record = sample_record();
        assert_eq!(
            hit_test(&record, (101.0, 41.0), 6.0),
            Some(Gesture::Vertex { eye: Eye::Right, vertex: Vertex::Top })
        );
        assert_eq!(
            hit_test(&record, (299.0, 62.0), 6.0),
            Some(Gesture::Center { eye: Eye::Left })
        );
        // left eye radius handle sits at 300 + 2.5 * 7
        assert_eq!(
            hit_test(&record, (317.5, 62.0), 6.0),
            Some(Gesture::Resize { eye: Eye::Left })
        );
        assert_eq!(hit_test(&record, (200.0, 200.0), 6.0), None);
    }
}
