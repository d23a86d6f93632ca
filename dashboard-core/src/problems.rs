use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use dashboard_types::{Difficulty, Problem};

const BUNDLED_QUESTIONS: &str = include_str!("../data/questions.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read problem file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse problem file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate problem id: {0}")]
    DuplicateId(String),
}

#[derive(Deserialize)]
struct QuestionFile {
    questions: Vec<Problem>,
}

/// The fixed set of practice problems listed on the dashboard.
#[derive(Debug, Clone)]
pub struct ProblemCatalog {
    problems: Vec<Problem>,
}

impl ProblemCatalog {
    /// The dataset compiled into the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_QUESTIONS)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: QuestionFile = serde_json::from_str(json)?;

        let mut seen = HashSet::new();
        for problem in &file.questions {
            if !seen.insert(problem.id.as_str()) {
                return Err(CatalogError::DuplicateId(problem.id.clone()));
            }
        }

        Ok(Self {
            problems: file.questions,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &Problem> {
        self.problems
            .iter()
            .filter(move |p| p.difficulty == difficulty)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}
