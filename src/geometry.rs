//! Arrow glyphs drawn over each eye.
//!
//! Every arrow is a stroke path of eight points: the shaft, a two-segment head
//! at the far end, back along the shaft, and a head at the near end. Paths are
//! rebuilt from scratch out of the current [`CoordinateRecord`].

use std::fmt;

use crate::model::{CoordinateRecord, Eye, SIZE_SCALE};

const CENTER_HEAD_LEN: f32 = 5.0;
const CENTER_HEAD_HALF_WIDTH: f32 = 2.0;
const DISTANCE_HEAD_LEN: f32 = 5.0;
const DISTANCE_HEAD_HALF_WIDTH: f32 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ArrowPath {
    points: Vec<(f32, f32)>,
}

impl ArrowPath {
    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }
}

/// SVG path data: `M x,y L x,y ...`.
impl fmt::Display for ArrowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (x, y)) in self.points.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let cmd = if i == 0 { 'M' } else { 'L' };
            write!(f, "{cmd}{x},{y}")?;
        }
        Ok(())
    }
}

fn half_span(diameter: f32) -> f32 {
    diameter * SIZE_SCALE / 2.0
}

/// Horizontal double-headed arrow across the eye at `(x, y)`.
pub fn center_arrow(x: f32, y: f32, diameter: f32) -> ArrowPath {
    let h = half_span(diameter);
    let (left, right) = (x - h, x + h);
    ArrowPath {
        points: vec![
            (left, y),
            (right, y),
            (right - CENTER_HEAD_LEN, y - CENTER_HEAD_HALF_WIDTH),
            (right - CENTER_HEAD_LEN, y + CENTER_HEAD_HALF_WIDTH),
            (right, y),
            (left, y),
            (left + CENTER_HEAD_LEN, y - CENTER_HEAD_HALF_WIDTH),
            (left + CENTER_HEAD_LEN, y + CENTER_HEAD_HALF_WIDTH),
        ],
    }
}

/// Arrow between a vertex and a center, shifted right by the eye radius.
pub fn distance_arrow(
    top_x: f32,
    top_y: f32,
    center_x: f32,
    center_y: f32,
    diameter: f32,
) -> ArrowPath {
    let h = half_span(diameter);
    let (tx, cx) = (top_x + h, center_x + h);
    ArrowPath {
        points: vec![
            (tx, top_y),
            (cx, center_y),
            (cx + DISTANCE_HEAD_HALF_WIDTH, center_y - DISTANCE_HEAD_LEN),
            (cx - DISTANCE_HEAD_HALF_WIDTH, center_y - DISTANCE_HEAD_LEN),
            (cx, center_y),
            (tx, top_y),
            (tx + DISTANCE_HEAD_HALF_WIDTH, top_y + DISTANCE_HEAD_LEN),
            (tx - DISTANCE_HEAD_HALF_WIDTH, top_y + DISTANCE_HEAD_LEN),
        ],
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EyeArrows {
    pub center: ArrowPath,
    pub top: ArrowPath,
    pub bottom: ArrowPath,
}

impl EyeArrows {
    pub fn iter(&self) -> impl Iterator<Item = &ArrowPath> {
        [&self.center, &self.top, &self.bottom].into_iter()
    }
}

/// The six arrows of a page.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrowSet {
    pub right: EyeArrows,
    pub left: EyeArrows,
}

impl ArrowSet {
    pub fn compute(record: &CoordinateRecord) -> Self {
        Self {
            right: eye_arrows(record, Eye::Right),
            left: eye_arrows(record, Eye::Left),
        }
    }

    pub fn eye(&self, eye: Eye) -> &EyeArrows {
        match eye {
            Eye::Right => &self.right,
            Eye::Left => &self.left,
        }
    }
}

fn eye_arrows(record: &CoordinateRecord, eye: Eye) -> EyeArrows {
    let l = record.eye(eye);
    EyeArrows {
        center: center_arrow(l.center.0, l.center.1, l.size),
        top: distance_arrow(l.top.0, l.top.1, l.center.0, l.center.1, l.size),
        // runs from the center down to the bottom vertex
        bottom: distance_arrow(l.center.0, l.center.1, l.bottom.0, l.bottom.1, l.size),
    }
}
