//! The `examkit init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    std::fs::create_dir_all("exams")?;
    let sample_path = Path::new("exams/sample.json");
    if sample_path.exists() {
        println!("exams/sample.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_EXAM)?;
        println!("Created exams/sample.json");
    }

    let answers_path = Path::new("exams/sample-answers.json");
    if !answers_path.exists() {
        std::fs::write(answers_path, SAMPLE_ANSWERS)?;
        println!("Created exams/sample-answers.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: examkit validate --exam exams/sample.json");
    println!("  2. Run: examkit inspect --exam exams/sample.json");
    println!("  3. Run: examkit score --test-id sample --answers exams/sample-answers.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

default_backend = "local"
warning_threshold_secs = 300
output_dir = "./examkit-results"

[backends.local]
type = "local"
exam_dir = "./exams"

[backends.remote]
type = "http"
base_url = "https://exams.example.com/api"
api_key = "${EXAMKIT_API_KEY}"
"#;

const SAMPLE_EXAM: &str = r#"{
  "title": "Sample Reading Practice",
  "durationMinutes": 20,
  "type": "reading",
  "reading": [
    {
      "id": "p1",
      "title": "Urban Beekeeping",
      "content": "Over the past decade, rooftop hives have spread across many European capitals...",
      "questionGroups": [
        {
          "type": "true-false-not-given",
          "instructions": "Do the following statements agree with the information given in the passage?",
          "questions": [
            { "qNumber": 1, "text": "Rooftop hives first appeared in Paris.", "correctAnswers": ["NOT GIVEN"] },
            { "qNumber": 2, "text": "City bees produce less honey than rural bees.", "correctAnswers": ["FALSE"] }
          ]
        },
        {
          "type": "sentence-completion",
          "instructions": "Complete the sentences. Write NO MORE THAN TWO WORDS from the passage.",
          "questions": [
            { "qNumber": 3, "text": "Urban bees benefit from a wide variety of ____.", "correctAnswers": ["flowers", "flowering plants"] }
          ]
        }
      ]
    }
  ]
}
"#;

const SAMPLE_ANSWERS: &str = r#"{
  "answers": ["not given", "true", "the flowers"],
  "timeTakenSecs": 840
}
"#;
