use serde::{Deserialize, Serialize};

/// Pixel span of one diameter unit when an eye is rendered.
pub const SIZE_SCALE: f32 = 14.0;

// ── Eyes ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    /// OD
    Right,
    /// OS
    Left,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Right, Eye::Left];

    pub fn label(self) -> &'static str {
        match self {
            Eye::Right => "OD",
            Eye::Left => "OS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vertex {
    Top,
    Bottom,
}

/// Read-only view of one eye's landmarks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeLandmarks {
    pub top: (f32, f32),
    pub center: (f32, f32),
    pub bottom: (f32, f32),
    pub size: f32,
}

impl EyeLandmarks {
    /// Half the rendered diameter, in pixels.
    pub fn radius(&self) -> f32 {
        self.size * SIZE_SCALE / 2.0
    }
}

// ── Coordinate record ───────────────────────────────────────────────────────

/// Landmark positions for both eyes of one page, as served by the data source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    #[serde(rename = "ODTopX")]
    od_top_x: f32,
    #[serde(rename = "ODTopY")]
    od_top_y: f32,
    #[serde(rename = "ODCenterX")]
    od_center_x: f32,
    #[serde(rename = "ODCenterY")]
    od_center_y: f32,
    #[serde(rename = "ODBottomX")]
    od_bottom_x: f32,
    #[serde(rename = "ODBottomY")]
    od_bottom_y: f32,
    #[serde(rename = "ODSize")]
    od_size: f32,

    #[serde(rename = "OSTopX")]
    os_top_x: f32,
    #[serde(rename = "OSTopY")]
    os_top_y: f32,
    #[serde(rename = "OSCenterX")]
    os_center_x: f32,
    #[serde(rename = "OSCenterY")]
    os_center_y: f32,
    #[serde(rename = "OSBottomX")]
    os_bottom_x: f32,
    #[serde(rename = "OSBottomY")]
    os_bottom_y: f32,
    #[serde(rename = "OSSize")]
    os_size: f32,

    #[serde(rename = "chartTypeString")]
    pub chart_type: String,
    pub message_type: i64,
    pub timestamp: f64,
}

/// Mutable handles to the fields of one eye.
struct EyeFields<'a> {
    top_x: &'a mut f32,
    top_y: &'a mut f32,
    center_x: &'a mut f32,
    center_y: &'a mut f32,
    bottom_x: &'a mut f32,
    bottom_y: &'a mut f32,
    size: &'a mut f32,
}

#[cfg(test)]
impl CoordinateRecord {
    /// A record with both eyes at the same landmarks.
    pub fn symmetric(landmarks: EyeLandmarks) -> Self {
        let mut record = Self {
            od_top_x: 0.0,
            od_top_y: 0.0,
            od_center_x: 0.0,
            od_center_y: 0.0,
            od_bottom_x: 0.0,
            od_bottom_y: 0.0,
            od_size: 0.0,
            os_top_x: 0.0,
            os_top_y: 0.0,
            os_center_x: 0.0,
            os_center_y: 0.0,
            os_bottom_x: 0.0,
            os_bottom_y: 0.0,
            os_size: 0.0,
            chart_type: String::new(),
            message_type: 0,
            timestamp: 0.0,
        };
        for eye in Eye::BOTH {
            record.set_eye(eye, landmarks);
        }
        record
    }

    pub fn set_eye(&mut self, eye: Eye, landmarks: EyeLandmarks) {
        let f = self.fields_mut(eye);
        (*f.top_x, *f.top_y) = landmarks.top;
        (*f.center_x, *f.center_y) = landmarks.center;
        (*f.bottom_x, *f.bottom_y) = landmarks.bottom;
        *f.size = landmarks.size;
    }
}

impl CoordinateRecord {
    fn fields_mut(&mut self, eye: Eye) -> EyeFields<'_> {
        match eye {
            Eye::Right => EyeFields {
                top_x: &mut self.od_top_x,
                top_y: &mut self.od_top_y,
                center_x: &mut self.od_center_x,
                center_y: &mut self.od_center_y,
                bottom_x: &mut self.od_bottom_x,
                bottom_y: &mut self.od_bottom_y,
                size: &mut self.od_size,
            },
            Eye::Left => EyeFields {
                top_x: &mut self.os_top_x,
                top_y: &mut self.os_top_y,
                center_x: &mut self.os_center_x,
                center_y: &mut self.os_center_y,
                bottom_x: &mut self.os_bottom_x,
                bottom_y: &mut self.os_bottom_y,
                size: &mut self.os_size,
            },
        }
    }

    pub fn eye(&self, eye: Eye) -> EyeLandmarks {
        match eye {
            Eye::Right => EyeLandmarks {
                top: (self.od_top_x, self.od_top_y),
                center: (self.od_center_x, self.od_center_y),
                bottom: (self.od_bottom_x, self.od_bottom_y),
                size: self.od_size,
            },
            Eye::Left => EyeLandmarks {
                top: (self.os_top_x, self.os_top_y),
                center: (self.os_center_x, self.os_center_y),
                bottom: (self.os_bottom_x, self.os_bottom_y),
                size: self.os_size,
            },
        }
    }

    /// Moves a single landmark vertically. Its X stays put.
    pub fn set_vertex_y(&mut self, eye: Eye, vertex: Vertex, y: f32) {
        let f = self.fields_mut(eye);
        match vertex {
            Vertex::Top => *f.top_y = y,
            Vertex::Bottom => *f.bottom_y = y,
        }
    }

    /// Moves the center to `(x, y)`, dragging both vertices' X along with it.
    pub fn move_center(&mut self, eye: Eye, x: f32, y: f32) {
        let f = self.fields_mut(eye);
        *f.center_x = x;
        *f.top_x = x;
        *f.bottom_x = x;
        *f.center_y = y;
    }

    pub fn set_size(&mut self, eye: Eye, size: f32) {
        *self.fields_mut(eye).size = size;
    }
}

// ── Manifest ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "ptosisImages")]
    pub images: Vec<String>,
    pub scope: String,
}

#[cfg(test)]
pub(crate) fn sample_record() -> CoordinateRecord {
    let mut record = CoordinateRecord::symmetric(EyeLandmarks {
        top: (100.0, 40.0),
        center: (100.0, 60.0),
        bottom: (100.0, 80.0),
        size: 2.0,
    });
    record.set_eye(
        Eye::Left,
        EyeLandmarks {
            top: (300.0, 42.0),
            center: (300.0, 62.0),
            bottom: (300.0, 82.0),
            size: 2.5,
        },
    );
    record.chart_type = "ptosis".to_string();
    record.message_type = 7;
    record.timestamp = 1_650_000_000_000.0;
    record
}
