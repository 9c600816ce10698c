use super::*;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::Category;

/// Question bank held in memory, optionally loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    questions: Vec<Question>,
}

/// On-disk shape of a bank entry; ids are optional
#[derive(Debug, Deserialize)]
struct BankEntry {
    #[serde(default)]
    id: Option<String>,
    category_id: CategoryId,
    category: String,
    difficulty: Difficulty,
    question: String,
    answer: String,
    incorrect: [String; 3],
}

impl InMemoryRepository {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn from_json_file(path: &Path) -> RepoResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> RepoResult<Self> {
        let entries: Vec<BankEntry> =
            serde_json::from_str(raw).map_err(|e| RepoError::Parse(e.to_string()))?;

        let questions = entries
            .into_iter()
            .map(|e| Question {
                id: e.id.unwrap_or_else(|| ulid::Ulid::new().to_string()),
                category_id: e.category_id,
                category: e.category,
                difficulty: e.difficulty,
                question: e.question,
                answer: e.answer,
                incorrect: e.incorrect,
            })
            .collect();

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn list_categories(&self) -> RepoResult<Vec<CategoryCount>> {
        // Ordered by category id so listings are stable
        let mut by_id: BTreeMap<CategoryId, CategoryCount> = BTreeMap::new();

        for q in &self.questions {
            let entry = by_id.entry(q.category_id).or_insert_with(|| CategoryCount {
                category: Category {
                    id: q.category_id,
                    name: q.category.clone(),
                },
                easy: 0,
                medium: 0,
                hard: 0,
            });
            match q.difficulty {
                Difficulty::Easy => entry.easy += 1,
                Difficulty::Medium => entry.medium += 1,
                Difficulty::Hard => entry.hard += 1,
            }
        }

        Ok(by_id.into_values().collect())
    }

    async fn fetch_questions(
        &self,
        category: CategoryId,
        difficulty: Difficulty,
        count: usize,
    ) -> RepoResult<Vec<Question>> {
        let mut matching: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| q.category_id == category && q.difficulty == difficulty)
            .cloned()
            .collect();

        matching.shuffle(&mut rand::rng());
        matching.truncate(count);
        Ok(matching)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
