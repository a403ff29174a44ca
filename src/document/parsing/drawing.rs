//! Inline drawings: reading picture extents, identifying image payloads and
//! building the inline markup for a new picture.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::super::models::{Emu, Extent};
use super::super::view::ImageRef;
use super::formatting::Read;
use crate::error::CopyError;
use crate::markup::{element, ns, Element};

/// A recognized image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageInfo {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Native size at 96 DPI.
    pub fn native_extent(&self) -> Extent {
        Extent {
            cx: Emu::from_pixels(self.width_px),
            cy: Emu::from_pixels(self.height_px),
        }
    }
}

/// Sniff the format and pixel size of an image payload.
pub(crate) fn identify(name: &str, bytes: &[u8]) -> Result<ImageInfo, CopyError> {
    let unsupported = || CopyError::UnsupportedImage(name.to_string());
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| unsupported())?;
    let format = reader.format().ok_or_else(unsupported)?;
    let (width_px, height_px) = reader.into_dimensions().map_err(|_| unsupported())?;
    Ok(ImageInfo {
        format,
        width_px,
        height_px,
    })
}

/// Declared on-page size of a drawing, from its `wp:extent`.
pub(crate) fn extent(image: &ImageRef<'_>) -> Read<Extent> {
    let Some(el) = image.drawing().find("wp:extent") else {
        return Ok(None);
    };
    let dimension = |key: &str| -> Result<Emu, CopyError> {
        let raw = el.attr(key).unwrap_or_default();
        match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(Emu(value)),
            _ => Err(CopyError::malformed("image extent", raw)),
        }
    };
    Ok(Some(Extent {
        cx: dimension("cx")?,
        cy: dimension("cy")?,
    }))
}

/// A `w:drawing` holding one inline picture that shows relationship `rel_id`.
pub(crate) fn inline_picture(rel_id: &str, extent: Extent, drawing_id: u32, name: &str) -> Element {
    let cx = extent.cx.0.to_string();
    let cy = extent.cy.0.to_string();

    let picture = element("pic", "pic")
        .with_child(
            element("pic", "nvPicPr")
                .with_child(
                    element("pic", "cNvPr")
                        .with_attr("id", "0")
                        .with_attr("name", name),
                )
                .with_child(element("pic", "cNvPicPr")),
        )
        .with_child(
            element("pic", "blipFill")
                .with_child(element("a", "blip").with_attr("r:embed", rel_id))
                .with_child(element("a", "stretch").with_child(element("a", "fillRect"))),
        )
        .with_child(
            element("pic", "spPr")
                .with_child(
                    element("a", "xfrm")
                        .with_child(element("a", "off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(
                            element("a", "ext")
                                .with_attr("cx", cx.as_str())
                                .with_attr("cy", cy.as_str()),
                        ),
                )
                .with_child(
                    element("a", "prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(element("a", "avLst")),
                ),
        );

    let inline = element("wp", "inline")
        .with_child(
            element("wp", "extent")
                .with_attr("cx", cx.as_str())
                .with_attr("cy", cy.as_str()),
        )
        .with_child(
            element("wp", "docPr")
                .with_attr("id", drawing_id.to_string())
                .with_attr("name", format!("Picture {drawing_id}")),
        )
        .with_child(
            element("wp", "cNvGraphicFramePr").with_child(
                element("a", "graphicFrameLocks")
                    .with_attr("xmlns:a", ns::A)
                    .with_attr("noChangeAspect", "1"),
            ),
        )
        .with_child(
            element("a", "graphic")
                .with_attr("xmlns:a", ns::A)
                .with_child(
                    element("a", "graphicData")
                        .with_attr("uri", ns::PIC)
                        .with_child(picture.with_attr("xmlns:pic", ns::PIC)),
                ),
        );

    element("w", "drawing").with_child(inline)
}
