use crate::line::OutlineLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Section,
    Subsection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineHeading {
    pub level: HeadingLevel,
    pub title: String,
    pub line: usize,
}

/// Classify a single outline line. Only `# ` and `## ` prefixes at column zero
/// count; deeper levels and unprefixed text are ignored.
pub fn detect_heading(line: &OutlineLine) -> Option<OutlineHeading> {
    let (level, rest) = if let Some(rest) = line.text.strip_prefix("## ") {
        (HeadingLevel::Subsection, rest)
    } else if let Some(rest) = line.text.strip_prefix("# ") {
        (HeadingLevel::Section, rest)
    } else {
        return None;
    };

    Some(OutlineHeading {
        level,
        title: rest.trim().to_string(),
        line: line.number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> OutlineLine {
        OutlineLine {
            text: text.to_string(),
            number: 7,
        }
    }

    #[test]
    fn detects_both_levels() {
        let section = detect_heading(&line("# Chapter One  ")).unwrap();
        assert_eq!(section.level, HeadingLevel::Section);
        assert_eq!(section.title, "Chapter One");
        assert_eq!(section.line, 7);

        let subsection = detect_heading(&line("##  Section A")).unwrap();
        assert_eq!(subsection.level, HeadingLevel::Subsection);
        assert_eq!(subsection.title, "Section A");
    }

    #[test]
    fn ignores_other_lines() {
        assert!(detect_heading(&line("### Too deep")).is_none());
        assert!(detect_heading(&line("#NoSpace")).is_none());
        assert!(detect_heading(&line(" # indented")).is_none());
        assert!(detect_heading(&line("plain text")).is_none());
        assert!(detect_heading(&line("")).is_none());
    }
}
