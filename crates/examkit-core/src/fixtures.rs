//! Document builders shared by unit tests.

use crate::model::{
    Candidate, ExamDocument, ExamKind, Part, Question, QuestionGroup, QuestionKind, WritingTask,
};

/// Free-text group whose questions expect `answer{qNumber}`.
pub fn text_group(first_q: u32, count: usize) -> QuestionGroup {
    QuestionGroup {
        kind: QuestionKind::NoteCompletion,
        instructions: Some("Write NO MORE THAN TWO WORDS".into()),
        text: None,
        headings: vec![],
        options: vec![],
        questions: (0..count as u32)
            .map(|i| Question {
                q_number: first_q + i,
                text: None,
                options: vec![],
                correct_answers: vec![format!("answer{}", first_q + i)],
            })
            .collect(),
    }
}

pub fn part(id: &str, groups: Vec<QuestionGroup>) -> Part {
    Part {
        id: id.into(),
        title: id.to_uppercase(),
        content: String::new(),
        audio_url: None,
        question_groups: groups,
    }
}

/// Document with one free-text group per part, sized by `reading` and `listening`.
pub fn document(reading: &[usize], listening: &[usize], writing: usize) -> ExamDocument {
    let mut q = 1u32;
    let mut build = |prefix: &str, sizes: &[usize]| -> Vec<Part> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let group = text_group(q, n);
                q += n as u32;
                part(&format!("{prefix}{}", i + 1), vec![group])
            })
            .collect()
    };
    let reading = build("p", reading);
    let listening = build("s", listening);
    ExamDocument {
        title: "Fixture".into(),
        duration_minutes: 60,
        kind: ExamKind::Full,
        real_test: false,
        reading,
        listening,
        writing: (0..writing)
            .map(|i| WritingTask {
                id: format!("w{}", i + 1),
                title: format!("Task {}", i + 1),
                prompt: "Discuss.".into(),
                min_words: Some(150),
            })
            .collect(),
    }
}

pub fn candidates(pairs: &[(&str, &str)]) -> Vec<Candidate> {
    pairs.iter().map(|(id, text)| Candidate::new(*id, *text)).collect()
}
