mod heading;
mod line;
mod state;

pub use heading::{detect_heading, HeadingLevel, OutlineHeading};

use line::{read_lines, OutlineLine};
use serde::Serialize;
use state::State;
use std::fmt;
use std::io::{self, BufRead, Cursor};
use thiserror::Error;
use tracing::debug;

/// Parsed `toc.md`: the book title and its two-level header tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub play_order: u32,
    pub subsections: Vec<Subsection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subsection {
    pub title: String,
    pub play_order: u32,
}

/// One navigable entry in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineEntry<'a> {
    pub level: HeadingLevel,
    pub title: &'a str,
    pub play_order: u32,
}

impl Outline {
    /// Flatten the tree into document order, sections before their subsections.
    pub fn entries(&self) -> impl Iterator<Item = OutlineEntry<'_>> {
        self.sections.iter().flat_map(|section| {
            std::iter::once(OutlineEntry {
                level: HeadingLevel::Section,
                title: section.title.as_str(),
                play_order: section.play_order,
            })
            .chain(section.subsections.iter().map(|sub| OutlineEntry {
                level: HeadingLevel::Subsection,
                title: sub.title.as_str(),
                play_order: sub.play_order,
            }))
        })
    }

    pub fn entry_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| 1 + section.subsections.len())
            .sum()
    }
}

/// What to do with a `## ` line seen before any `# ` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    #[default]
    Drop,
    AttachToImplicitRoot,
    Error,
}

impl OrphanPolicy {
    pub const ALL: &'static [OrphanPolicy] = &[
        OrphanPolicy::Drop,
        OrphanPolicy::AttachToImplicitRoot,
        OrphanPolicy::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrphanPolicy::Drop => "drop",
            OrphanPolicy::AttachToImplicitRoot => "attach-to-implicit-root",
            OrphanPolicy::Error => "error",
        }
    }
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrphanPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "drop" => Ok(OrphanPolicy::Drop),
            "attach-to-implicit-root" => Ok(OrphanPolicy::AttachToImplicitRoot),
            "error" => Ok(OrphanPolicy::Error),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineOptions {
    pub orphan_policy: OrphanPolicy,
}

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("failed to read outline: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: subsection '{title}' appears before any section")]
    OrphanSubsection { line: usize, title: String },
}

/// Parse outline text with the default options.
///
/// Returns `Ok(None)` when the text has no non-blank line to use as a title.
pub fn parse(text: &str) -> Result<Option<Outline>, OutlineError> {
    parse_with(text, OutlineOptions::default())
}

pub fn parse_with(text: &str, options: OutlineOptions) -> Result<Option<Outline>, OutlineError> {
    let mut reader = Cursor::new(text.as_bytes());
    parse_reader(&mut reader, options)
}

pub fn parse_reader<R: BufRead>(
    reader: &mut R,
    options: OutlineOptions,
) -> Result<Option<Outline>, OutlineError> {
    let lines = read_lines(reader)?;
    let outline = parse_lines(&lines, options)?;

    if let Some(outline) = &outline {
        debug!(
            title = %outline.title,
            sections = outline.sections.len(),
            entries = outline.entry_count(),
            "parsed outline"
        );
    }

    Ok(outline)
}

fn parse_lines(
    lines: &[OutlineLine],
    options: OutlineOptions,
) -> Result<Option<Outline>, OutlineError> {
    let Some(title_idx) = lines.iter().position(|line| !line.is_blank()) else {
        return Ok(None);
    };

    let title = lines[title_idx].text.trim().to_string();
    let mut state = State::new(title, options.orphan_policy);

    for line in &lines[title_idx + 1..] {
        let Some(heading) = detect_heading(line) else {
            continue;
        };

        match heading.level {
            HeadingLevel::Section => state.enter_section(heading),
            HeadingLevel::Subsection => state.append_subsection(heading)?,
        }
    }

    let (title, sections) = state.finalize();
    Ok(Some(Outline { title, sections }))
}
