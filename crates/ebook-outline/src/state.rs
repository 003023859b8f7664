use tracing::warn;

use crate::heading::OutlineHeading;
use crate::{OrphanPolicy, OutlineError, Section, Subsection};

/// Play order 1 belongs to the title / table-of-contents entry.
const FIRST_PLAY_ORDER: u32 = 1;

enum Position {
    NoSection,
    InSection,
}

pub struct State {
    title: String,
    policy: OrphanPolicy,
    position: Position,
    order: u32,
    sections: Vec<Section>,
}

impl State {
    pub fn new(title: String, policy: OrphanPolicy) -> Self {
        Self {
            title,
            policy,
            position: Position::NoSection,
            order: FIRST_PLAY_ORDER,
            sections: Vec::new(),
        }
    }

    pub fn enter_section(&mut self, heading: OutlineHeading) {
        self.open_section(heading.title);
    }

    pub fn append_subsection(&mut self, heading: OutlineHeading) -> Result<(), OutlineError> {
        match self.position {
            Position::InSection => {
                self.push_subsection(heading.title);
                Ok(())
            }
            Position::NoSection => self.handle_orphan(heading),
        }
    }

    pub fn finalize(self) -> (String, Vec<Section>) {
        (self.title, self.sections)
    }

    fn handle_orphan(&mut self, heading: OutlineHeading) -> Result<(), OutlineError> {
        match self.policy {
            OrphanPolicy::Drop => {
                warn!(
                    line = heading.line,
                    title = %heading.title,
                    "dropping subsection that precedes every section"
                );
                Ok(())
            }
            OrphanPolicy::AttachToImplicitRoot => {
                let root_title = self.title.clone();
                self.open_section(root_title);
                self.push_subsection(heading.title);
                Ok(())
            }
            OrphanPolicy::Error => Err(OutlineError::OrphanSubsection {
                line: heading.line,
                title: heading.title,
            }),
        }
    }

    fn open_section(&mut self, title: String) {
        let play_order = self.next_order();
        self.sections.push(Section {
            title,
            play_order,
            subsections: Vec::new(),
        });
        self.position = Position::InSection;
    }

    fn push_subsection(&mut self, title: String) {
        let play_order = self.next_order();
        if let Some(section) = self.sections.last_mut() {
            section.subsections.push(Subsection { title, play_order });
        }
    }

    fn next_order(&mut self) -> u32 {
        self.order += 1;
        self.order
    }
}
