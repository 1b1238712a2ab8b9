//! The `examkit inspect` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::ExamDocument;
use examkit_core::parser::parse_exam_document;
use examkit_core::slots::{answer_key, build_slots, build_steps, Slot};

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let doc = parse_exam_document(&exam_path)?;
    let slots = build_slots(&doc);

    println!(
        "{} ({}, {} min{})",
        if doc.title.is_empty() { "Untitled exam" } else { doc.title.as_str() },
        doc.kind,
        doc.duration_minutes,
        if doc.real_test { ", real test" } else { "" }
    );
    println!();
    print_steps(&doc, &slots);
    if !slots.is_empty() {
        println!();
        print_slots(&doc, &slots);
    }

    Ok(())
}

fn print_steps(doc: &ExamDocument, slots: &[Slot]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Step", "Kind", "Slots", "Questions"]);

    for (i, step) in build_steps(doc).iter().enumerate() {
        let (range, questions) = match &step.slots {
            Some(r) if !r.is_empty() => (
                format!("{}..{}", r.start, r.end),
                format!("Q{}-Q{}", slots[r.start].q_number, slots[r.end - 1].q_number),
            ),
            Some(_) => ("-".to_string(), "none".to_string()),
            None => ("-".to_string(), doc.writing[step.item].title.clone()),
        };
        table.add_row(vec![
            Cell::new(i),
            Cell::new(&step.label),
            Cell::new(step.kind),
            Cell::new(range),
            Cell::new(questions),
        ]);
    }

    println!("{table}");
}

fn print_slots(doc: &ExamDocument, slots: &[Slot]) {
    let mut table = Table::new();
    table.set_header(vec!["Slot", "Q", "Type", "Choices", "Answer key"]);

    for (slot, correct) in slots.iter().zip(answer_key(doc)) {
        let choices = slot
            .options
            .iter()
            .chain(&slot.headings)
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![
            Cell::new(slot.index),
            Cell::new(slot.q_number),
            Cell::new(slot.kind),
            Cell::new(choices),
            Cell::new(correct.join(" / ")),
        ]);
    }

    println!("{table}");
}
