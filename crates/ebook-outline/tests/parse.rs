use ebook_outline::{
    parse, parse_with, HeadingLevel, OrphanPolicy, Outline, OutlineError, OutlineOptions, Section,
    Subsection,
};
use pretty_assertions::assert_eq;

fn options(orphan_policy: OrphanPolicy) -> OutlineOptions {
    OutlineOptions { orphan_policy }
}

fn play_orders(outline: &Outline) -> Vec<u32> {
    outline.entries().map(|entry| entry.play_order).collect()
}

#[test]
fn parses_two_level_outline() {
    let outline = parse("My Book\n\n# Chapter One\n## Section A\n# Chapter Two\n")
        .unwrap()
        .unwrap();

    assert_eq!(
        outline,
        Outline {
            title: "My Book".to_string(),
            sections: vec![
                Section {
                    title: "Chapter One".to_string(),
                    play_order: 2,
                    subsections: vec![Subsection {
                        title: "Section A".to_string(),
                        play_order: 3,
                    }],
                },
                Section {
                    title: "Chapter Two".to_string(),
                    play_order: 4,
                    subsections: Vec::new(),
                },
            ],
        }
    );
}

#[test]
fn empty_or_blank_text_is_absent() {
    assert!(parse("").unwrap().is_none());
    assert!(parse("\n\n   \n\t\n").unwrap().is_none());
    assert!(parse("\r\n\r\n").unwrap().is_none());
}

#[test]
fn title_only_outline_has_no_sections() {
    let outline = parse("\n\n  Lonely Title  \n").unwrap().unwrap();
    assert_eq!(outline.title, "Lonely Title");
    assert!(outline.sections.is_empty());
}

#[test]
fn title_line_is_never_a_header() {
    let outline = parse("# Heading Title\n# First\n").unwrap().unwrap();
    assert_eq!(outline.title, "# Heading Title");
    assert_eq!(outline.sections.len(), 1);
    assert_eq!(outline.sections[0].title, "First");
    assert_eq!(outline.sections[0].play_order, 2);
}

#[test]
fn leading_orphan_is_dropped_by_default() {
    let outline = parse("Book\n## Orphan\n# Real\n## Child\n").unwrap().unwrap();

    assert_eq!(outline.sections.len(), 1);
    assert_eq!(outline.sections[0].title, "Real");
    // the orphan consumes no play order
    assert_eq!(play_orders(&outline), vec![2, 3]);
    assert!(outline.entries().all(|entry| entry.title != "Orphan"));
}

#[test]
fn orphan_can_attach_to_implicit_root() {
    let outline = parse_with(
        "Book\n## Orphan\n# Real\n",
        options(OrphanPolicy::AttachToImplicitRoot),
    )
    .unwrap()
    .unwrap();

    assert_eq!(outline.sections.len(), 2);
    assert_eq!(outline.sections[0].title, "Book");
    assert_eq!(outline.sections[0].play_order, 2);
    assert_eq!(outline.sections[0].subsections[0].title, "Orphan");
    assert_eq!(outline.sections[0].subsections[0].play_order, 3);
    assert_eq!(outline.sections[1].play_order, 4);
}

#[test]
fn orphan_can_be_an_error() {
    let err = parse_with("Book\n\n## Orphan\n", options(OrphanPolicy::Error)).unwrap_err();
    match err {
        OutlineError::OrphanSubsection { line, title } => {
            assert_eq!(line, 3);
            assert_eq!(title, "Orphan");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn other_lines_are_ignored() {
    let text = "Book\nintro text\n# One\n### deep\n#tight\n\n## A\n- bullet\n## B\n# Two\n";
    let outline = parse(text).unwrap().unwrap();

    let entries: Vec<_> = outline
        .entries()
        .map(|entry| (entry.level, entry.title.to_string(), entry.play_order))
        .collect();
    assert_eq!(
        entries,
        vec![
            (HeadingLevel::Section, "One".to_string(), 2),
            (HeadingLevel::Subsection, "A".to_string(), 3),
            (HeadingLevel::Subsection, "B".to_string(), 4),
            (HeadingLevel::Section, "Two".to_string(), 5),
        ]
    );
}

#[test]
fn play_orders_strictly_increase_across_levels() {
    let mut text = String::from("Big Book\n");
    for chapter in 0..12 {
        text.push_str(&format!("# Chapter {chapter}\n"));
        for part in 0..(chapter % 4) {
            text.push_str(&format!("## Part {chapter}.{part}\n"));
        }
    }

    let outline = parse(&text).unwrap().unwrap();
    let orders = play_orders(&outline);

    assert_eq!(orders.len(), outline.entry_count());
    assert_eq!(orders.first().copied(), Some(2));
    assert!(orders.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(orders.last().copied(), Some(orders.len() as u32 + 1));
}

#[test]
fn subsections_attach_to_nearest_preceding_section() {
    let outline = parse("Book\n# A\n## a1\n## a2\n# B\n# C\n## c1\n")
        .unwrap()
        .unwrap();

    let shape: Vec<(String, Vec<String>)> = outline
        .sections
        .iter()
        .map(|section| {
            (
                section.title.clone(),
                section
                    .subsections
                    .iter()
                    .map(|sub| sub.title.clone())
                    .collect(),
            )
        })
        .collect();

    assert_eq!(
        shape,
        vec![
            ("A".to_string(), vec!["a1".to_string(), "a2".to_string()]),
            ("B".to_string(), Vec::new()),
            ("C".to_string(), vec!["c1".to_string()]),
        ]
    );
}

#[test]
fn orphan_policy_round_trips_through_strings() {
    for policy in OrphanPolicy::ALL {
        assert_eq!(policy.as_str().parse::<OrphanPolicy>(), Ok(*policy));
    }
    assert!("ignore".parse::<OrphanPolicy>().is_err());
}
