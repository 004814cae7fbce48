use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Segmentation mask a measurement was taken over.
///
/// Variants are declared in the order of their full names so the derived
/// ordering matches ordering by [`MaskType::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskType {
    /// Whole-cell mask
    CellMasks,
    /// Nuclear mask
    NucleiMasks,
}

impl MaskType {
    /// Two-letter tag used in canonical keys
    pub fn tag(&self) -> &'static str {
        match self {
            MaskType::CellMasks => "cl",
            MaskType::NucleiMasks => "nu",
        }
    }

    /// Full name used in export labels
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskType::CellMasks => "cell_masks",
            MaskType::NucleiMasks => "nuclei_masks",
        }
    }

    /// Parse a two-letter tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "cl" => Some(MaskType::CellMasks),
            "nu" => Some(MaskType::NucleiMasks),
            _ => None,
        }
    }
}

impl fmt::Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mask suffix patterns in match order. First match wins.
const SUFFIX_PATTERNS: &[(&str, MaskType)] = &[
    (r"(?i)[\s_-]+nuclei[\s_-]*masks$", MaskType::NucleiMasks),
    (r"(?i)[\s_-]+cell[\s_-]*masks$", MaskType::CellMasks),
    (
        r"(?i)[\s_-]+(?:cellpose|cp)[\s_-]*masks(?:[\s_-]*on[\s_-]*data[\s_-]*\d*)?$",
        MaskType::NucleiMasks,
    ),
];

struct SuffixPattern {
    regex: Regex,
    mask_type: MaskType,
}

fn suffix_patterns() -> &'static [SuffixPattern] {
    static PATTERNS: OnceLock<Vec<SuffixPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SUFFIX_PATTERNS
            .iter()
            .map(|&(pattern, mask_type)| SuffixPattern {
                regex: Regex::new(pattern).expect("suffix patterns are valid regexes"),
                mask_type,
            })
            .collect()
    })
}

/// A header split into its marker part and mask type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixMatch<'a> {
    /// Header text before the mask suffix
    pub marker: &'a str,
    /// Mask type the suffix denotes
    pub mask_type: MaskType,
}

/// Match a header against the mask suffix patterns.
///
/// A suffix with nothing in front of it is not a marker header.
pub fn match_suffix(header: &str) -> Option<SuffixMatch<'_>> {
    let header = header.trim_end();
    suffix_patterns().iter().find_map(|pattern| {
        let found = pattern.regex.find(header)?;
        (found.start() > 0).then(|| SuffixMatch {
            marker: &header[..found.start()],
            mask_type: pattern.mask_type,
        })
    })
}

/// Whether a header carries a recognized mask suffix
pub fn is_marker_header(header: &str) -> bool {
    match_suffix(header).is_some()
}

/// Split headers into marker headers and other headers.
///
/// Order and casing are preserved; classification is purely syntactic.
pub fn classify<S: AsRef<str>>(headers: &[S]) -> (Vec<&str>, Vec<&str>) {
    headers
        .iter()
        .map(|h| h.as_ref())
        .partition(|h| is_marker_header(h))
}
