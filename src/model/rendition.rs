//! Image rendition specifications.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SiteError;

/// A named, fixed-size derivative generated for every image attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rendition {
    /// Prefix of the generated file: `{name}-{original filename}`.
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// `true`: cover and centre-crop the exact box on white.
    /// `false`: fit inside the box preserving aspect ratio.
    #[serde(default)]
    pub fill: bool,
}

impl Rendition {
    /// File name of this rendition for an original attachment name.
    pub fn file_name(&self, original: &str) -> String {
        format!("{}-{}", self.name, original)
    }
}

/// Parses the compact `name height width [fill]` form used on the command line.
impl FromStr for Rendition {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(SiteError::Config(format!(
                "rendition '{s}' must be 'name height width [fill]'"
            )));
        }
        let number = |field: &str| {
            field
                .parse::<u32>()
                .map_err(|e| SiteError::Config(format!("rendition '{s}': bad size '{field}': {e}")))
        };
        let fill = match fields.get(3) {
            Some(flag) => parse_fill(flag).ok_or_else(|| {
                SiteError::Config(format!(
                    "rendition '{s}': fill must be 'fill', 'true' or 'false', got '{flag}'"
                ))
            })?,
            None => false,
        };
        Ok(Self {
            name: fields[0].to_string(),
            height: number(fields[1])?,
            width: number(fields[2])?,
            fill,
        })
    }
}

/// `fill` or a case-insensitive boolean.
fn parse_fill(flag: &str) -> Option<bool> {
    if flag.eq_ignore_ascii_case("fill") || flag.eq_ignore_ascii_case("true") {
        Some(true)
    } else if flag.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
