use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),
    #[error("surface has no width")]
    EmptySurface,
}

/// Page content box in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub content_width: f64,
    pub content_height: f64,
    /// Vertical offset of the image on the first page only.
    pub start_offset: f64,
}

impl PageGeometry {
    /// A4 with 10mm margins.
    pub const A4_DEFAULT: PageGeometry = PageGeometry {
        content_width: 190.0,
        content_height: 295.0,
        start_offset: 10.0,
    };

    pub fn new(
        content_width: f64,
        content_height: f64,
        start_offset: f64,
    ) -> Result<Self, LayoutError> {
        let geometry = Self {
            content_width,
            content_height,
            start_offset,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        if !(self.content_width.is_finite() && self.content_width > 0.0) {
            return Err(LayoutError::InvalidGeometry(format!(
                "content width {}",
                self.content_width
            )));
        }
        if !(self.content_height.is_finite() && self.content_height > 0.0) {
            return Err(LayoutError::InvalidGeometry(format!(
                "content height {}",
                self.content_height
            )));
        }
        if !self.start_offset.is_finite() {
            return Err(LayoutError::InvalidGeometry(format!(
                "start offset {}",
                self.start_offset
            )));
        }
        Ok(())
    }
}

/// Where the scaled image sits on one physical page.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    pub index: usize,
    /// Top of this page's slice, measured into the scaled image.
    pub source_offset: f64,
    /// Height of the slice that lands inside the content box. Zero on a
    /// trailing blank page.
    pub visible_height: f64,
    /// Y coordinate the full image is drawn at; negative from the second
    /// page on, so earlier slices hang above the content box.
    pub image_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    /// Always the geometry's content width; the capture is scaled to fit it.
    pub image_width: f64,
    pub image_height: f64,
    pub pages: Vec<PagePlacement>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Slice a captured surface of `width_px` x `height_px` into pages.
///
/// The image is scaled to the content width, the first slice is placed at
/// `start_offset`, and every following page repeats the full image shifted
/// up by one content height. A scaled height that is an exact multiple of
/// the content height yields one trailing blank page; page assemblers count
/// on the total staying floor(height / content_height) + 1.
pub fn paginate(
    width_px: u32,
    height_px: u32,
    geometry: &PageGeometry,
) -> Result<PagePlan, LayoutError> {
    geometry.validate()?;
    if width_px == 0 {
        return Err(LayoutError::EmptySurface);
    }

    let image_height = f64::from(height_px) * geometry.content_width / f64::from(width_px);

    let mut pages = vec![PagePlacement {
        index: 0,
        source_offset: 0.0,
        visible_height: image_height.min(geometry.content_height),
        image_y: geometry.start_offset,
    }];

    let mut height_left = image_height - geometry.content_height;
    while height_left >= 0.0 {
        let source_offset = image_height - height_left;
        pages.push(PagePlacement {
            index: pages.len(),
            source_offset,
            visible_height: height_left.min(geometry.content_height),
            image_y: height_left - image_height,
        });
        height_left -= geometry.content_height;
    }

    Ok(PagePlan {
        image_width: geometry.content_width,
        image_height,
        pages,
    })
}
