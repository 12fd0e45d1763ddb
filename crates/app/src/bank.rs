use std::error::Error;
use std::fs;

use exam_core::model::{QuestionBank, QuestionId, QuestionRecord, Subject};

/// Load the question paper from a JSON file, or fall back to the built-in
/// sample paper when no path is given.
pub fn load_bank(path: Option<&str>) -> Result<QuestionBank, Box<dyn Error>> {
    let questions = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str::<Vec<QuestionRecord>>(&raw)?
        }
        None => sample_paper(),
    };
    Ok(QuestionBank::new(questions)?)
}

/// Load the roster allow-list from a newline-separated file, or fall back to
/// the built-in sample rolls.
pub fn load_roster(path: Option<&str>) -> Result<Vec<String>, Box<dyn Error>> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            Ok(raw
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect())
        }
        None => Ok(default_roster()),
    }
}

pub fn default_roster() -> Vec<String> {
    ["ROLL001", "ROLL002", "ROLL003"]
        .map(str::to_owned)
        .to_vec()
}

fn question(id: u64, subject: Subject, prompt: &str, options: [&str; 4]) -> QuestionRecord {
    QuestionRecord::new(
        QuestionId::new(id),
        subject,
        prompt,
        options.map(str::to_owned),
    )
}

/// Built-in sample paper; the final slot is an unfilled placeholder.
fn sample_paper() -> Vec<QuestionRecord> {
    vec![
        question(
            1,
            Subject::Physics,
            "What is the SI unit of force?",
            ["Newton", "Joule", "Pascal", "Watt"],
        ),
        question(
            2,
            Subject::Chemistry,
            "What is H2O?",
            ["Oxygen", "Hydrogen", "Water", "Carbon Dioxide"],
        ),
        question(
            3,
            Subject::Biology,
            "What is the powerhouse of the cell?",
            ["Nucleus", "Mitochondria", "Ribosome", "Chloroplast"],
        ),
        question(
            4,
            Subject::Biology,
            "Which molecule carries genetic information?",
            ["RNA", "DNA", "ATP", "Protein"],
        ),
        question(5, Subject::Physics, "", ["", "", "", ""]),
    ]
}
