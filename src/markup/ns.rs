//! Namespace URIs and the canonical prefixes the tree uses for them

pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
pub const W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";
pub const W15: &str = "http://schemas.microsoft.com/office/word/2012/wordml";
pub const WP14: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing";
pub const WPS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingShape";
pub const V: &str = "urn:schemas-microsoft-com:vml";
pub const O: &str = "urn:schemas-microsoft-com:office:office";
pub const M: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
pub const CP: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Known namespaces and the prefix every parsed tree is normalized to.
const CANONICAL: &[(&str, &str)] = &[
    ("w", W),
    ("r", R),
    ("wp", WP),
    ("a", A),
    ("pic", PIC),
    ("mc", MC),
    ("w14", W14),
    ("w15", W15),
    ("wp14", WP14),
    ("wps", WPS),
    ("v", V),
    ("o", O),
    ("m", M),
    ("cp", CP),
    ("dc", DC),
    ("dcterms", DCTERMS),
    ("xsi", XSI),
];

/// Canonical prefix for a namespace URI, if it is one the engine knows.
pub fn canonical_prefix(uri: &str) -> Option<&'static str> {
    CANONICAL
        .iter()
        .find(|(_, known)| *known == uri)
        .map(|(prefix, _)| *prefix)
}

/// Namespace URI bound to a canonical prefix.
pub fn uri_for(prefix: &str) -> Option<&'static str> {
    CANONICAL
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|(_, uri)| *uri)
}

/// Join a prefix and a local name into a qualified name.
pub fn qn(prefix: &str, local: &str) -> String {
    format!("{prefix}:{local}")
}

/// Relationship types used by the engine.
pub mod rel {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
}
