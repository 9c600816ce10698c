use rand::Rng;

use super::shuffle;
use crate::types::*;

/// Difficulty of a round: easy until `medium_from`, medium until `hard_from`, then hard
pub fn difficulty_for_round(round: u32, medium_from: u32, hard_from: u32) -> Difficulty {
    if round >= hard_from {
        Difficulty::Hard
    } else if round >= medium_from {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

/// Unused categories per difficulty. A category may sit in several pools and
/// leaves all of them once consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPools {
    pub easy: Vec<Category>,
    pub medium: Vec<Category>,
    pub hard: Vec<Category>,
}

impl CategoryPools {
    /// Admit each category to every difficulty it has at least `min_questions` for
    pub fn from_counts(
        counts: &[CategoryCount],
        min_questions: u32,
        excluded: &[CategoryId],
    ) -> Self {
        let mut pools = Self::default();
        for count in counts {
            if excluded.contains(&count.category.id) {
                continue;
            }
            for difficulty in Difficulty::ALL {
                if count.count_for(difficulty) >= min_questions {
                    pools.get_mut(difficulty).push(count.category.clone());
                }
            }
        }
        pools
    }

    pub fn get(&self, difficulty: Difficulty) -> &[Category] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    fn get_mut(&mut self, difficulty: Difficulty) -> &mut Vec<Category> {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }

    pub fn is_empty(&self, difficulty: Difficulty) -> bool {
        self.get(difficulty).is_empty()
    }

    /// Drop a consumed category from every pool. Idempotent.
    pub fn remove_category(&mut self, id: CategoryId) {
        for difficulty in Difficulty::ALL {
            self.get_mut(difficulty).retain(|c| c.id != id);
        }
    }

    /// A uniformly random category of the given pool, still in the pool
    pub fn pick_random(&self, difficulty: Difficulty) -> Option<Category> {
        let pool = self.get(difficulty);
        if pool.is_empty() {
            return None;
        }
        let i = rand::rng().random_range(0..pool.len());
        Some(pool[i].clone())
    }

    /// Reshuffle a pool and offer its first few categories
    pub fn options(&mut self, difficulty: Difficulty) -> Vec<Category> {
        let pool = self.get_mut(difficulty);
        shuffle(pool);
        pool.iter().take(CATEGORY_OPTION_COUNT).cloned().collect()
    }
}
