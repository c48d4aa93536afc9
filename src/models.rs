use imageproc::geometry::{arc_length, contour_area};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<imageproc::point::Point<i32>> for Point {
    fn from(p: imageproc::point::Point<i32>) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }
}

impl From<imageproc::point::Point<f32>> for Point {
    fn from(p: imageproc::point::Point<f32>) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<Point> for imageproc::point::Point<f32> {
    fn from(p: Point) -> Self {
        imageproc::point::Point::new(p.x, p.y)
    }
}

/// Four corners of a detected card boundary, in no particular order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral(pub [Point; 4]);

/// Card corners in top-left, top-right, bottom-right, bottom-left order.
///
/// Only built by [`crate::detection::geometry::order_points`] or from an
/// axis-aligned rectangle, so the corner roles always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedQuadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl OrderedQuadrilateral {
    /// Corners of an axis-aligned rectangle; already ordered.
    pub fn from_rect(rect: &BoundingBox) -> Self {
        let left = rect.x as f32;
        let top = rect.y as f32;
        let right = (rect.x + rect.width) as f32;
        let bottom = (rect.y + rect.height) as f32;
        Self {
            top_left: Point::new(left, top),
            top_right: Point::new(right, top),
            bottom_right: Point::new(right, bottom),
            bottom_left: Point::new(left, bottom),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Output size of the rectified image: the longer of each pair of
    /// opposite edges, floored, never below one pixel.
    pub fn target_size(&self) -> (u32, u32) {
        let width_bottom = self.bottom_right.distance(&self.bottom_left);
        let width_top = self.top_right.distance(&self.top_left);
        let height_right = self.top_right.distance(&self.bottom_right);
        let height_left = self.top_left.distance(&self.bottom_left);

        let width = (width_bottom.floor() as u32).max(width_top.floor() as u32).max(1);
        let height = (height_right.floor() as u32).max(height_left.floor() as u32).max(1);
        (width, height)
    }
}

/// Axis-aligned box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A closed polygon traced along the border of a mask region.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    fn curve(&self) -> Vec<imageproc::point::Point<f32>> {
        self.points.iter().copied().map(Into::into).collect()
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        contour_area(&self.curve())
    }

    /// Length of the closed outline.
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.curve(), true)
    }

    /// Smallest axis-aligned box containing every point.
    pub fn bounding_box(&self) -> BoundingBox {
        if self.points.is_empty() {
            return BoundingBox::default();
        }
        let (min_x, min_y, max_x, max_y) = self.points.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        );
        let x = min_x.max(0.0) as u32;
        let y = min_y.max(0.0) as u32;
        BoundingBox {
            x,
            y,
            width: (max_x.max(0.0) as u32 - x) + 1,
            height: (max_y.max(0.0) as u32 - y) + 1,
        }
    }
}

/// One recognized text fragment with its position and confidence (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub confidence: u8,
    pub bbox: BoundingBox,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: u8, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.min(100),
            bbox,
        }
    }
}

/// Tokens in the engine's reading order.
pub type TokenStream = Vec<OcrToken>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        };
        f.write_str(label)
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => anyhow::bail!("unknown gender value {other:?}"),
        }
    }
}

/// Address block read from the back face.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub address: Option<String>,
    pub pincode: Option<String>,
}

/// Identity fields detected across both faces of a card.
///
/// A `None` field was not detected; it is omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

impl FieldRecord {
    /// Attach the back-face address block.
    pub fn with_address(mut self, back: AddressFields) -> Self {
        self.address = back.address;
        self.pincode = back.pincode;
        self
    }

    /// Present fields as `(key, value)` pairs in schema order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(name) = &self.name {
            entries.push(("name", name.clone()));
        }
        if let Some(dob) = &self.dob {
            entries.push(("dob", dob.clone()));
        }
        if let Some(gender) = self.gender {
            entries.push(("gender", gender.to_string()));
        }
        if let Some(number) = &self.aadhaar_number {
            entries.push(("aadhaar_number", number.clone()));
        }
        if let Some(address) = &self.address {
            entries.push(("address", address.clone()));
        }
        if let Some(pincode) = &self.pincode {
            entries.push(("pincode", pincode.clone()));
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
