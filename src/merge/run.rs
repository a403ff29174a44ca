//! Run copier
//!
//! Rebuilds one source run in the destination: text spans get their content
//! and explicitly set character formatting, image spans get their picture
//! re-embedded as a new media part, and hyperlinks get a fresh destination
//! relationship.

use super::attr::Scope;
use super::CopyContext;
use crate::document::parsing::{drawing, formatting};
use crate::document::{Hyperlink, ImageRef, Run, RunContent, RunKind};
use crate::error::CopyError;
use crate::markup::{element, schema, Element};

/// Copy one run. Text spans yield one destination run; image spans yield one
/// run per picture that could be re-embedded, possibly none.
pub fn copy_run(ctx: &mut CopyContext<'_>, run: &Run<'_>) -> Vec<Element> {
    match run.kind() {
        RunKind::Text(content) => vec![copy_text_run(ctx, run, content)],
        RunKind::Image(images) => images
            .iter()
            .filter_map(|image| copy_image(ctx, image))
            .collect(),
    }
}

fn copy_text_run(ctx: &mut CopyContext<'_>, run: &Run<'_>, content: Vec<RunContent>) -> Element {
    let mut out = element("w", "r");
    let rpr = run_properties(ctx, run);
    if rpr.has_element_children() {
        out.push(rpr);
    }

    for item in content {
        match item {
            RunContent::Text(text) => out.push(text_element(&text)),
            RunContent::Tab => out.push(element("w", "tab")),
            RunContent::Break(kind) => {
                let mut br = element("w", "br");
                if let Some(kind) = kind.as_type() {
                    br.set_attr("w:type", kind);
                }
                out.push(br);
            }
            RunContent::Verbatim(el) => {
                let el = ctx.clone_opaque(&el);
                out.push(el);
            }
        }
    }
    out
}

/// A `w:t`, preserving whitespace when it would otherwise be collapsed.
pub(crate) fn text_element(text: &str) -> Element {
    let mut t = element("w", "t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
    if !text.is_empty() {
        t.push_text(text);
    }
    t
}

fn toggle_element(name: &str, on: bool) -> Element {
    let el = Element::new(name);
    if on { el } else { el.with_attr("w:val", "0") }
}

fn run_properties(ctx: &mut CopyContext<'_>, run: &Run<'_>) -> Element {
    let order = schema::RUN_PROPERTIES;
    let mut rpr = element("w", "rPr");
    let mut attrs = ctx.attributes(Scope::Run);

    attrs.copy("character style", formatting::run_style(run), |style| {
        rpr.set_child_ordered(element("w", "rStyle").with_attr("w:val", style), order)
    });
    attrs.copy("font name", formatting::font_name(run), |name| {
        rpr.set_child_ordered(
            element("w", "rFonts")
                .with_attr("w:ascii", name.as_str())
                .with_attr("w:hAnsi", name),
            order,
        )
    });
    for (name, label) in [
        ("w:b", "bold"),
        ("w:i", "italic"),
        ("w:strike", "strikethrough"),
    ] {
        attrs.copy(label, formatting::toggle(run, name, label), |on| {
            rpr.set_child_ordered(toggle_element(name, on), order)
        });
    }
    attrs.copy("color", formatting::color(run), |rgb| {
        rpr.set_child_ordered(element("w", "color").with_attr("w:val", rgb.to_string()), order)
    });
    attrs.copy("font size", formatting::font_size(run), |half_points| {
        rpr.set_child_ordered(
            element("w", "sz").with_attr("w:val", half_points.to_string()),
            order,
        )
    });
    attrs.copy("underline", formatting::underline(run), |style| {
        rpr.set_child_ordered(element("w", "u").with_attr("w:val", style), order)
    });
    attrs.copy("vertical alignment", formatting::vertical_align(run), |align| {
        rpr.set_child_ordered(
            element("w", "vertAlign").with_attr("w:val", align.as_val()),
            order,
        )
    });

    rpr
}

fn copy_image(ctx: &mut CopyContext<'_>, image: &ImageRef<'_>) -> Option<Element> {
    let source = ctx.source;
    let Some(embed_id) = image.embed_id() else {
        ctx.skip(
            Scope::Image,
            "drawing",
            &CopyError::Unsupported("drawing without an embedded picture".to_string()),
        );
        return None;
    };

    let part_name = match source.relationships().part_name(embed_id) {
        Ok(name) => name,
        Err(e) => {
            ctx.skip(Scope::Image, embed_id, &e);
            return None;
        }
    };
    let Some(bytes) = source.part(&part_name) else {
        ctx.skip(Scope::Image, embed_id, &CopyError::MissingPart(part_name));
        return None;
    };
    let info = match drawing::identify(&part_name, bytes) {
        Ok(info) => info,
        Err(e) => {
            ctx.skip(Scope::Image, part_name.as_str(), &e);
            return None;
        }
    };

    let extent = match drawing::extent(image) {
        Ok(Some(extent)) => extent,
        Ok(None) => info.native_extent(),
        Err(e) => {
            ctx.skip(Scope::Image, "extent", &e);
            info.native_extent()
        }
    };

    let file_name = part_name.rsplit('/').next().unwrap_or(&part_name).to_string();
    let rel_id = ctx
        .dest
        .add_image(bytes.to_vec(), info.extension(), info.content_type());
    let drawing_id = ctx.dest.next_drawing_id();
    log::debug!(
        "embedded {file_name} as {rel_id} ({:.2}in x {:.2}in)",
        extent.width_inches(),
        extent.height_inches()
    );

    Some(element("w", "r").with_child(drawing::inline_picture(
        &rel_id, extent, drawing_id, &file_name,
    )))
}

/// Destination `w:hyperlink` shell for a source hyperlink, or `None` when the
/// link cannot be reproduced and its runs should be copied bare.
///
/// A relationship id takes precedence over an anchor.
pub fn open_hyperlink(ctx: &mut CopyContext<'_>, link: &Hyperlink<'_>) -> Option<Element> {
    let mut out = element("w", "hyperlink");
    if let Some(rel_id) = link.rel_id() {
        match ctx.source.relationships().external_target(rel_id) {
            Ok(url) => {
                let url = url.to_string();
                let new_id = ctx.dest.add_hyperlink(&url);
                out.set_attr("r:id", new_id);
            }
            Err(e) => {
                ctx.skip(Scope::Hyperlink, rel_id, &e);
                return None;
            }
        }
    } else if let Some(anchor) = link.anchor() {
        out.set_attr("w:anchor", anchor);
    } else {
        ctx.skip(
            Scope::Hyperlink,
            "hyperlink",
            &CopyError::Unsupported("hyperlink without a target".to_string()),
        );
        return None;
    }

    if let Some(tooltip) = link.element().attr("w:tooltip") {
        out.set_attr("w:tooltip", tooltip);
    }
    out.set_attr("w:history", "1");
    Some(out)
}
