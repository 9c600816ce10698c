use super::*;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::time::Instant;

use crate::types::Category;

/// Open Trivia Database client
pub struct OpenTdbRepository {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenTdbRepository {
    pub fn new(base_url: String, timeout: Duration) -> RepoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepoError::Http(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> RepoResult<T> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| RepoError::Timeout(self.timeout))?
            .map_err(|e| RepoError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RepoError::Http(format!(
                "OpenTDB returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RepoError::Parse(e.to_string()))
    }

    async fn count_for(&self, category: Category) -> RepoResult<CategoryCount> {
        let url = format!("{}/api_count.php?category={}", self.base_url, category.id);
        let counts: CountResponse = self.get_json(&url).await?;
        let c = counts.category_question_count;

        Ok(CategoryCount {
            category,
            easy: c.total_easy_question_count,
            medium: c.total_medium_question_count,
            hard: c.total_hard_question_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CategoryListResponse {
    trivia_categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    category_question_count: QuestionCounts,
}

#[derive(Debug, Deserialize)]
struct QuestionCounts {
    #[serde(default)]
    total_easy_question_count: u32,
    #[serde(default)]
    total_medium_question_count: u32,
    #[serde(default)]
    total_hard_question_count: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<RawQuestion>,
}

/// Every string field arrives base64 encoded (`encode=base64`)
#[derive(Debug, Deserialize)]
struct RawQuestion {
    category: String,
    difficulty: String,
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

fn decode(field: &str) -> RepoResult<String> {
    let bytes = STANDARD
        .decode(field)
        .map_err(|e| RepoError::Parse(format!("bad base64: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| RepoError::Parse(e.to_string()))
}

impl RawQuestion {
    fn into_question(self, category_id: CategoryId) -> RepoResult<Question> {
        let difficulty: Difficulty = decode(&self.difficulty)?
            .parse()
            .map_err(RepoError::Parse)?;

        let incorrect = self
            .incorrect_answers
            .iter()
            .map(String::as_str)
            .map(decode)
            .collect::<RepoResult<Vec<_>>>()?;
        let incorrect: [String; 3] = incorrect.try_into().map_err(|v: Vec<String>| {
            RepoError::Parse(format!("expected 3 incorrect answers, got {}", v.len()))
        })?;

        Ok(Question {
            id: ulid::Ulid::new().to_string(),
            category_id,
            category: decode(&self.category)?,
            difficulty,
            question: decode(&self.question)?,
            answer: decode(&self.correct_answer)?,
            incorrect,
        })
    }
}

#[async_trait]
impl QuestionRepository for OpenTdbRepository {
    async fn list_categories(&self) -> RepoResult<Vec<CategoryCount>> {
        let start = Instant::now();
        let url = format!("{}/api_category.php", self.base_url);
        let list: CategoryListResponse = self.get_json(&url).await?;

        let counts =
            futures::future::join_all(list.trivia_categories.into_iter().map(|c| self.count_for(c)))
                .await
                .into_iter()
                .collect::<RepoResult<Vec<_>>>()?;

        tracing::debug!(
            "OpenTDB listed {} categories in {}ms",
            counts.len(),
            start.elapsed().as_millis()
        );
        Ok(counts)
    }

    async fn fetch_questions(
        &self,
        category: CategoryId,
        difficulty: Difficulty,
        count: usize,
    ) -> RepoResult<Vec<Question>> {
        let mut amount = count;

        // Ask for fewer when the category cannot fill the batch
        while amount > 0 {
            let url = format!(
                "{}/api.php?amount={}&category={}&difficulty={}&type=multiple&encode=base64",
                self.base_url, amount, category, difficulty
            );
            let response: QuestionResponse = self.get_json(&url).await?;

            match response.response_code {
                0 => {
                    return response
                        .results
                        .into_iter()
                        .map(|q| q.into_question(category))
                        .collect();
                }
                1 | 4 => {
                    tracing::warn!(
                        "OpenTDB could not supply {} {} questions for category {}, halving",
                        amount,
                        difficulty,
                        category
                    );
                    amount /= 2;
                }
                code => return Err(RepoError::Api(code)),
            }
        }

        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "opentdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn test_raw_question_decodes() {
        let raw = RawQuestion {
            category: b64("Science: Computers"),
            difficulty: b64("medium"),
            question: b64("What does CPU stand for?"),
            correct_answer: b64("Central Processing Unit"),
            incorrect_answers: vec![
                b64("Central Process Unit"),
                b64("Computer Personal Unit"),
                b64("Central Processor Unit"),
            ],
        };

        let q = raw.into_question(18).unwrap();
        assert_eq!(q.category_id, 18);
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.answer, "Central Processing Unit");
        assert_eq!(q.incorrect[2], "Central Processor Unit");
    }

    #[test]
    fn test_raw_question_rejects_boolean_type() {
        let raw = RawQuestion {
            category: b64("General"),
            difficulty: b64("easy"),
            question: b64("The sky is blue."),
            correct_answer: b64("True"),
            incorrect_answers: vec![b64("False")],
        };

        assert!(matches!(raw.into_question(9), Err(RepoError::Parse(_))));
    }

    #[test]
    fn test_question_response_without_results() {
        let response: QuestionResponse = serde_json::from_str(r#"{"response_code":1}"#).unwrap();
        assert_eq!(response.response_code, 1);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    #[ignore] // Hits the public OpenTDB API
    async fn test_opentdb_live() {
        let repo =
            OpenTdbRepository::new("https://opentdb.com".to_string(), Duration::from_secs(10))
                .unwrap();
        let questions = repo
            .fetch_questions(9, Difficulty::Easy, 3)
            .await
            .unwrap();
        assert!(questions.len() <= 3);
    }
}
