//! Paragraph copier
//!
//! Builds a fresh destination paragraph: explicitly set paragraph formatting
//! first, then the runs in source order with bookmarks left where they were
//! and contiguous hyperlinked runs regrouped under one destination link.

use super::attr::Scope;
use super::run::{copy_run, open_hyperlink};
use super::CopyContext;
use crate::document::parsing::formatting;
use crate::document::{Hyperlink, Paragraph, ParagraphItem};
use crate::error::CopyError;
use crate::markup::{element, schema, Element};

/// Copy one paragraph into a new, detached destination paragraph element.
pub fn copy_paragraph(ctx: &mut CopyContext<'_>, paragraph: &Paragraph<'_>) -> Element {
    let mut out = element("w", "p");
    let ppr = paragraph_properties(ctx, paragraph);
    if ppr.has_element_children() {
        out.push(ppr);
    }

    let mut links = LinkTracker::default();
    for item in paragraph.items() {
        match item {
            ParagraphItem::Run(run) => {
                let copied = copy_run(ctx, &run);
                match run.hyperlink() {
                    Some(link) => links.push(ctx, &mut out, link, copied),
                    None => {
                        links.close(&mut out);
                        copied.into_iter().for_each(|run| out.push(run));
                    }
                }
            }
            ParagraphItem::Bookmark(marker) => {
                links.close(&mut out);
                if let Some(id) = marker.attr("w:id") {
                    ctx.registry.observe(id);
                }
                if let Some(name) = marker.attr("w:name") {
                    ctx.registry.observe_name(name);
                }
                let marker = ctx.clone_opaque(marker);
                out.push(marker);
            }
            ParagraphItem::Unsupported(node) => {
                ctx.skip(
                    Scope::Paragraph,
                    node.name.as_str(),
                    &CopyError::Unsupported(node.name.clone()),
                );
            }
        }
    }
    links.close(&mut out);

    out
}

fn paragraph_properties(ctx: &mut CopyContext<'_>, paragraph: &Paragraph<'_>) -> Element {
    let order = schema::PARAGRAPH_PROPERTIES;
    let mut ppr = element("w", "pPr");

    {
        let mut attrs = ctx.attributes(Scope::Paragraph);
        attrs.copy("paragraph style", formatting::paragraph_style(paragraph), |style| {
            ppr.set_child_ordered(element("w", "pStyle").with_attr("w:val", style), order)
        });
        attrs.copy("alignment", formatting::alignment(paragraph), |alignment| {
            ppr.set_child_ordered(
                element("w", "jc").with_attr("w:val", alignment.as_val()),
                order,
            )
        });
        attrs.copy("left indent", formatting::left_indent(paragraph), |twips| {
            ppr.ensure_child_ordered("w:ind", order)
                .set_attr("w:left", twips.to_string())
        });
        attrs.copy("right indent", formatting::right_indent(paragraph), |twips| {
            ppr.ensure_child_ordered("w:ind", order)
                .set_attr("w:right", twips.to_string())
        });
        attrs.copy("space before", formatting::space_before(paragraph), |twips| {
            ppr.ensure_child_ordered("w:spacing", order)
                .set_attr("w:before", twips.to_string())
        });
        attrs.copy("space after", formatting::space_after(paragraph), |twips| {
            ppr.ensure_child_ordered("w:spacing", order)
                .set_attr("w:after", twips.to_string())
        });
        attrs.copy("line spacing", formatting::line_spacing(paragraph), |line| {
            ppr.ensure_child_ordered("w:spacing", order)
                .set_attr("w:line", line.to_string())
        });
        attrs.copy("line spacing rule", formatting::line_rule(paragraph), |rule| {
            ppr.ensure_child_ordered("w:spacing", order)
                .set_attr("w:lineRule", rule.as_val())
        });
    }

    for name in ["w:pBdr", "w:shd"] {
        if let Some(block) = paragraph.property(name) {
            let block = ctx.clone_opaque(block);
            ppr.set_child_ordered(block, order);
        }
    }

    if paragraph.property("w:sectPr").is_some() {
        ctx.skip(
            Scope::Paragraph,
            "w:sectPr",
            &CopyError::Unsupported("section break".to_string()),
        );
    }

    ppr
}

/// Groups runs that came from the same source hyperlink.
#[derive(Default)]
struct LinkTracker<'s> {
    open: Option<OpenLink<'s>>,
}

struct OpenLink<'s> {
    source: Hyperlink<'s>,
    /// `None` when the source link could not be reproduced.
    shell: Option<Element>,
}

impl<'s> LinkTracker<'s> {
    fn push(
        &mut self,
        ctx: &mut CopyContext<'_>,
        out: &mut Element,
        link: Hyperlink<'s>,
        runs: Vec<Element>,
    ) {
        let continues = self
            .open
            .as_ref()
            .is_some_and(|open| open.source.same_as(&link));
        if !continues {
            self.close(out);
            self.open = Some(OpenLink {
                source: link,
                shell: open_hyperlink(ctx, &link),
            });
        }

        match self.open.as_mut().and_then(|open| open.shell.as_mut()) {
            Some(shell) => runs.into_iter().for_each(|run| shell.push(run)),
            None => runs.into_iter().for_each(|run| out.push(run)),
        }
    }

    fn close(&mut self, out: &mut Element) {
        if let Some(OpenLink {
            shell: Some(shell), ..
        }) = self.open.take()
        {
            if shell.has_element_children() {
                out.push(shell);
            }
        }
    }
}
