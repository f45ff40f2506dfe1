//! Version stamping of source units.
//!
//! Only two kinds of line are touched: the plugin's version declaration
//! (`PLUGINVERSION[]`) and the web config default (`@$config`). On those lines
//! every occurrence of the placeholder becomes the build identifier. The
//! version string is read from whichever of the two kinds the manifest names,
//! as the text between the first and last double quote.

use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::manifest::{Markers, VersionSource};
use crate::source::SourceUnit;
use crate::utils::parser;

/// Result of stamping one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedText {
    pub content: Vec<u8>,
    /// Marker lines seen (whether or not they held the placeholder).
    pub marker_lines: usize,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampOutcome {
    pub path: String,
    pub marker_lines: usize,
    pub rewritten: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampSummary {
    pub units: Vec<StampOutcome>,
    /// First version extracted across the build set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Rewrite marker lines of `content`. Line terminators and bytes outside the
/// substituted placeholders are preserved, whatever the file's encoding.
pub fn stamp_text(
    content: &[u8],
    build_id: &str,
    markers: &Markers,
    version_from: VersionSource,
) -> StampedText {
    let mut out = Vec::with_capacity(content.len());
    let mut marker_lines = 0;
    let mut version = None;

    for line in parser::lines_inclusive(content) {
        let source = if parser::contains(line, markers.version_declaration.as_bytes()) {
            VersionSource::VersionDeclaration
        } else if parser::contains(line, markers.config_default.as_bytes()) {
            VersionSource::ConfigDefault
        } else {
            out.extend_from_slice(line);
            continue;
        };

        marker_lines += 1;
        let stamped =
            parser::replace_all(line, markers.placeholder.as_bytes(), build_id.as_bytes());

        if source == version_from && version.is_none() {
            version = parser::between_quotes(&stamped)
                .filter(|v| !v.is_empty())
                .map(|v| String::from_utf8_lossy(v).into_owned());
        }

        out.extend_from_slice(&stamped);
    }

    StampedText {
        content: out,
        marker_lines,
        version,
    }
}

/// Stamp one file in place.
///
/// A file without marker lines is left untouched.
pub fn stamp_file(
    path: &Path,
    build_id: &str,
    markers: &Markers,
    version_from: VersionSource,
) -> Result<StampOutcome> {
    let display = path.to_string_lossy().to_string();
    let content =
        std::fs::read(path).map_err(|e| Error::source_access(&display, "read", e.to_string()))?;

    let stamped = stamp_text(&content, build_id, markers, version_from);
    let rewritten = stamped.content != content;

    if rewritten {
        std::fs::write(path, &stamped.content)
            .map_err(|e| Error::source_access(&display, "write", e.to_string()))?;
    }

    Ok(StampOutcome {
        path: display,
        marker_lines: stamped.marker_lines,
        rewritten,
        version: stamped.version,
    })
}

/// Stamp every unit in order. The first extracted version wins.
pub fn stamp_units(
    units: &[SourceUnit],
    build_id: &str,
    markers: &Markers,
    version_from: VersionSource,
) -> Result<StampSummary> {
    let mut summary = StampSummary::default();

    for unit in units {
        let outcome = stamp_file(&unit.path, build_id, markers, version_from)?;
        log_status!(
            "stamp",
            "{}: {} marker line(s){}",
            unit.display_name(),
            outcome.marker_lines,
            if outcome.rewritten { ", rewritten" } else { "" }
        );

        if let Some(found) = &outcome.version {
            match &summary.version {
                None => summary.version = Some(found.clone()),
                Some(first) if first != found => {
                    log_status!(
                        "stamp",
                        "Ignoring version {} in {}; keeping {}",
                        found,
                        unit.display_name(),
                        first
                    );
                }
                Some(_) => {}
            }
        }

        summary.units.push(outcome);
    }

    Ok(summary)
}
