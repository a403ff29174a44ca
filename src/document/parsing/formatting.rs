//! Paragraph and run formatting readers
//!
//! Each reader returns `Ok(None)` when the property is not set on the source,
//! `Ok(Some(_))` with the parsed value, or a [`CopyError`] when the property is
//! present but its value cannot be understood.

use std::str::FromStr;

use super::super::models::*;
use super::super::view::{Paragraph, Run};
use crate::error::CopyError;
use crate::markup::Element;

pub(crate) type Read<T> = Result<Option<T>, CopyError>;

const UNDERLINES: &[&str] = &[
    "single",
    "words",
    "double",
    "thick",
    "dotted",
    "dottedHeavy",
    "dash",
    "dashedHeavy",
    "dashLong",
    "dashLongHeavy",
    "dotDash",
    "dashDotHeavy",
    "dotDotDash",
    "dashDotDotHeavy",
    "wave",
    "wavyHeavy",
    "wavyDouble",
    "none",
];

/// The `w:val` of a property element that requires one.
fn required_val<'a>(el: &'a Element, attribute: &'static str) -> Result<&'a str, CopyError> {
    el.attr("w:val")
        .ok_or_else(|| CopyError::malformed(attribute, format!("<{}> without w:val", el.name)))
}

fn number<T: FromStr>(el: &Element, key: &str, attribute: &'static str) -> Read<T> {
    match el.attr(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CopyError::malformed(attribute, raw)),
    }
}

pub(crate) fn paragraph_style(paragraph: &Paragraph<'_>) -> Read<String> {
    match paragraph.property("w:pStyle") {
        None => Ok(None),
        Some(el) => required_val(el, "paragraph style").map(|v| Some(v.to_string())),
    }
}

pub(crate) fn alignment(paragraph: &Paragraph<'_>) -> Read<Alignment> {
    let Some(jc) = paragraph.property("w:jc") else {
        return Ok(None);
    };
    let val = required_val(jc, "alignment")?;
    Alignment::from_val(val)
        .map(Some)
        .ok_or_else(|| CopyError::malformed("alignment", val))
}

pub(crate) fn left_indent(paragraph: &Paragraph<'_>) -> Read<i32> {
    indent(paragraph, &["w:left", "w:start"], "left indent")
}

pub(crate) fn right_indent(paragraph: &Paragraph<'_>) -> Read<i32> {
    indent(paragraph, &["w:right", "w:end"], "right indent")
}

fn indent(paragraph: &Paragraph<'_>, keys: &[&str], attribute: &'static str) -> Read<i32> {
    let Some(ind) = paragraph.property("w:ind") else {
        return Ok(None);
    };
    for key in keys {
        if let Some(value) = number(ind, key, attribute)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub(crate) fn space_before(paragraph: &Paragraph<'_>) -> Read<u32> {
    spacing(paragraph, "w:before", "space before")
}

pub(crate) fn space_after(paragraph: &Paragraph<'_>) -> Read<u32> {
    spacing(paragraph, "w:after", "space after")
}

pub(crate) fn line_spacing(paragraph: &Paragraph<'_>) -> Read<i32> {
    spacing(paragraph, "w:line", "line spacing")
}

fn spacing<T: FromStr>(paragraph: &Paragraph<'_>, key: &str, attribute: &'static str) -> Read<T> {
    match paragraph.property("w:spacing") {
        None => Ok(None),
        Some(el) => number(el, key, attribute),
    }
}

pub(crate) fn line_rule(paragraph: &Paragraph<'_>) -> Read<LineRule> {
    let Some(rule) = paragraph
        .property("w:spacing")
        .and_then(|el| el.attr("w:lineRule"))
    else {
        return Ok(None);
    };
    LineRule::from_val(rule)
        .map(Some)
        .ok_or_else(|| CopyError::malformed("line spacing rule", rule))
}

pub(crate) fn run_style(run: &Run<'_>) -> Read<String> {
    match run.property("w:rStyle") {
        None => Ok(None),
        Some(el) => required_val(el, "character style").map(|v| Some(v.to_string())),
    }
}

/// A tri-state on/off property such as `w:b` or `w:strike`.
pub(crate) fn toggle(run: &Run<'_>, name: &str, attribute: &'static str) -> Read<bool> {
    let Some(el) = run.property(name) else {
        return Ok(None);
    };
    match el.attr("w:val") {
        None | Some("1") | Some("true") | Some("on") => Ok(Some(true)),
        Some("0") | Some("false") | Some("off") => Ok(Some(false)),
        Some(other) => Err(CopyError::malformed(attribute, other)),
    }
}

pub(crate) fn underline(run: &Run<'_>) -> Read<String> {
    let Some(u) = run.property("w:u") else {
        return Ok(None);
    };
    let val = u.attr("w:val").unwrap_or("single");
    if UNDERLINES.contains(&val) {
        Ok(Some(val.to_string()))
    } else {
        Err(CopyError::malformed("underline", val))
    }
}

pub(crate) fn vertical_align(run: &Run<'_>) -> Read<VerticalAlign> {
    let Some(el) = run.property("w:vertAlign") else {
        return Ok(None);
    };
    let val = required_val(el, "vertical alignment")?;
    VerticalAlign::from_val(val)
        .map(Some)
        .ok_or_else(|| CopyError::malformed("vertical alignment", val))
}

/// Font size in half-points, as stored in `w:sz`.
pub(crate) fn font_size(run: &Run<'_>) -> Read<u32> {
    let Some(sz) = run.property("w:sz") else {
        return Ok(None);
    };
    match number::<u32>(sz, "w:val", "font size")? {
        Some(0) => Err(CopyError::malformed("font size", "0")),
        Some(size) => Ok(Some(size)),
        None => Err(CopyError::malformed("font size", "<w:sz> without w:val")),
    }
}

pub(crate) fn font_name(run: &Run<'_>) -> Read<String> {
    Ok(run
        .property("w:rFonts")
        .and_then(|fonts| fonts.attr("w:ascii").or_else(|| fonts.attr("w:hAnsi")))
        .map(str::to_string))
}

/// Explicit RGB color. `auto` counts as unset.
pub(crate) fn color(run: &Run<'_>) -> Read<Rgb> {
    let Some(el) = run.property("w:color") else {
        return Ok(None);
    };
    match el.attr("w:val") {
        None | Some("auto") => Ok(None),
        Some(hex) => hex
            .parse::<Rgb>()
            .map(Some)
            .map_err(|_| CopyError::malformed("color", hex)),
    }
}

impl ParagraphFormat {
    /// Formatting of a paragraph, with unreadable values treated as unset.
    pub fn of(paragraph: &Paragraph<'_>) -> Self {
        ParagraphFormat {
            style: paragraph_style(paragraph).ok().flatten(),
            alignment: alignment(paragraph).ok().flatten(),
            left_indent: left_indent(paragraph).ok().flatten(),
            right_indent: right_indent(paragraph).ok().flatten(),
            space_before: space_before(paragraph).ok().flatten(),
            space_after: space_after(paragraph).ok().flatten(),
            line_spacing: line_spacing(paragraph).ok().flatten(),
            line_rule: line_rule(paragraph).ok().flatten(),
        }
    }
}

impl TextFormatting {
    /// Formatting of a run, with unreadable values treated as unset.
    pub fn of(run: &Run<'_>) -> Self {
        TextFormatting {
            bold: toggle(run, "w:b", "bold").ok().flatten(),
            italic: toggle(run, "w:i", "italic").ok().flatten(),
            underline: underline(run).ok().flatten(),
            strikethrough: toggle(run, "w:strike", "strikethrough").ok().flatten(),
            vertical_align: vertical_align(run).ok().flatten(),
            font_size: font_size(run).ok().flatten().map(|half| half as f32 / 2.0),
            font_name: font_name(run).ok().flatten(),
            color: color(run).ok().flatten(),
            style: run_style(run).ok().flatten(),
        }
    }
}
