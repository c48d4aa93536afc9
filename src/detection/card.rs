use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::detection::contours::{approximate_polygon, find_external_contours, largest_contour};
use crate::detection::geometry::{order_points, rectify};
use crate::detection::preprocessing::{clean_mask, white_mask, WhiteBounds};
use crate::error::ExtractError;
use crate::models::{Contour, OrderedQuadrilateral, Quadrilateral};
use crate::pipeline::{stage, PipelineContext};

/// How the card boundary was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardOutline {
    /// The largest region simplified to exactly four corners.
    Quadrilateral(OrderedQuadrilateral),
    /// The region did not simplify to four corners; its axis-aligned
    /// bounding rectangle is used instead.
    BoundingBoxFallback {
        bounds: OrderedQuadrilateral,
        vertices: usize,
    },
}

impl CardOutline {
    pub fn corners(&self) -> &OrderedQuadrilateral {
        match self {
            CardOutline::Quadrilateral(quad) => quad,
            CardOutline::BoundingBoxFallback { bounds, .. } => bounds,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CardOutline::BoundingBoxFallback { .. })
    }
}

/// An upright, perspective-corrected card.
#[derive(Debug, Clone)]
pub struct RectifiedCard {
    pub image: DynamicImage,
    pub outline: CardOutline,
}

/// Finds the card in a photo by its near-white background and warps it flat.
#[derive(Debug, Clone)]
pub struct CardRectifier {
    pub bounds: WhiteBounds,
    /// Half-width of the square morphology kernel; 2 gives 5x5.
    pub kernel_radius: u8,
    /// Polygon tolerance as a fraction of the contour perimeter.
    pub approx_tolerance: f64,
}

impl Default for CardRectifier {
    fn default() -> Self {
        Self {
            bounds: WhiteBounds::default(),
            kernel_radius: 2,
            approx_tolerance: 0.02,
        }
    }
}

impl CardRectifier {
    /// Cleaned binary mask of card-coloured pixels.
    pub fn mask(&self, image: &DynamicImage) -> GrayImage {
        clean_mask(&white_mask(image, &self.bounds), self.kernel_radius)
    }

    /// Resolve the card outline from a mask produced by [`CardRectifier::mask`].
    pub fn locate(&self, mask: &GrayImage) -> Result<CardOutline, ExtractError> {
        let contours = find_external_contours(mask);
        debug!(count = contours.len(), "external contours found");
        let card = largest_contour(contours).ok_or(ExtractError::CardNotFound)?;
        Ok(self.outline_of(&card))
    }

    fn outline_of(&self, card: &Contour) -> CardOutline {
        let epsilon = self.approx_tolerance * card.perimeter();
        let polygon = approximate_polygon(&card.points, epsilon);

        if let &[a, b, c, d] = polygon.as_slice() {
            let ordered = order_points(&Quadrilateral([a, b, c, d]));
            debug!(?ordered, "card outline is a quadrilateral");
            CardOutline::Quadrilateral(ordered)
        } else {
            let rect = Contour::new(polygon.clone()).bounding_box();
            debug!(vertices = polygon.len(), ?rect, "card outline is not a quadrilateral, using its bounding box");
            CardOutline::BoundingBoxFallback {
                bounds: OrderedQuadrilateral::from_rect(&rect),
                vertices: polygon.len(),
            }
        }
    }

    /// Locate the card in `image` and warp it upright.
    #[instrument(level = "debug", skip(self, image, context))]
    pub fn rectify(
        &self,
        image: &DynamicImage,
        context: &PipelineContext,
        label: &str,
    ) -> Result<RectifiedCard, ExtractError> {
        let mask = self.mask(image);
        context.save_debug(stage::CARD_MASK, label, &DynamicImage::ImageLuma8(mask.clone()))?;

        let outline = self.locate(&mask)?;
        let warped = rectify(image, outline.corners());
        debug!(width = warped.width(), height = warped.height(), "card rectified");
        context.save_debug(stage::CARD_RECTIFIED, label, &warped)?;

        Ok(RectifiedCard {
            image: warped,
            outline,
        })
    }
}
