use rand::seq::IndexedRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::types::{Difficulty, TaskType};

pub const NO_CONTENT: &str = "No content found";

/// Supplies task text for random choices.
pub trait ContentSource {
    fn random_content(&self, task_type: TaskType, rng: &mut dyn RngCore) -> String;
}

/// Tasks of one kind, split by difficulty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLevels {
    #[serde(default)]
    pub safe: Vec<String>,
    #[serde(default)]
    pub spicy: Vec<String>,
    #[serde(default)]
    pub risky: Vec<String>,
}

impl ContentLevels {
    fn pool(&self, difficulty: Difficulty) -> Vec<&String> {
        match difficulty {
            Difficulty::Safe => self.safe.iter().collect(),
            Difficulty::Spicy => self.spicy.iter().collect(),
            Difficulty::Risky => self.risky.iter().collect(),
            Difficulty::All => self
                .safe
                .iter()
                .chain(&self.spicy)
                .chain(&self.risky)
                .collect(),
        }
    }
}

/// All truths and dares known to the server, loaded from `content.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLibrary {
    #[serde(default)]
    pub truths: ContentLevels,
    #[serde(default)]
    pub dares: ContentLevels,
}

impl Default for ContentLibrary {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            truths: ContentLevels {
                safe: owned(&[
                    "What is your favourite meme right now?",
                    "Which song always lifts your mood?",
                    "If you could travel anywhere right now, where would you go?",
                    "What is your funniest skill?",
                    "If you won a million, what would you buy first?",
                ]),
                spicy: owned(&[
                    "What is the most useless thing you have ever bought?",
                    "What are you most afraid of right now?",
                ]),
                risky: owned(&["What is the strangest fact about you?"]),
            },
            dares: ContentLevels {
                safe: owned(&[
                    "Sing a verse of your favourite song in a robot voice",
                    "Do 10 dance moves to imaginary music",
                    "Hold the yoga tree pose for 10 seconds",
                    "Take a selfie with the silliest face you can make",
                ]),
                spicy: owned(&[
                    "Record a voice message complimenting every player",
                    "Say any phrase in an angry whisper",
                ]),
                risky: owned(&["Write your next message using only emoji (at least 5)"]),
            },
        }
    }
}

impl ContentLibrary {
    pub fn levels(&self, task_type: TaskType) -> &ContentLevels {
        match task_type {
            TaskType::Truth => &self.truths,
            TaskType::Dare => &self.dares,
        }
    }

    pub fn pick(&self, task_type: TaskType, difficulty: Difficulty, rng: &mut dyn RngCore) -> String {
        self.levels(task_type)
            .pool(difficulty)
            .choose(rng)
            .map(|s| s.to_string())
            .unwrap_or_else(|| NO_CONTENT.to_string())
    }

    /// Binds the library to one difficulty setting.
    pub fn with_difficulty(&self, difficulty: Difficulty) -> FilteredContent<'_> {
        FilteredContent {
            library: self,
            difficulty,
        }
    }
}

pub struct FilteredContent<'a> {
    library: &'a ContentLibrary,
    difficulty: Difficulty,
}

impl ContentSource for FilteredContent<'_> {
    fn random_content(&self, task_type: TaskType, rng: &mut dyn RngCore) -> String {
        self.library.pick(task_type, self.difficulty, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn library() -> ContentLibrary {
        serde_json::from_str(
            r#"{
                "truths": {"safe": ["t-safe"], "spicy": ["t-spicy"]},
                "dares": {"risky": ["d-risky"]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn picks_only_from_requested_level() {
        let lib = library();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(lib.pick(TaskType::Truth, Difficulty::Spicy, &mut rng), "t-spicy");
            assert_eq!(lib.pick(TaskType::Dare, Difficulty::Risky, &mut rng), "d-risky");
        }
    }

    #[test]
    fn all_draws_from_every_level() {
        let lib = library();
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(lib.pick(TaskType::Truth, Difficulty::All, &mut rng));
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn empty_pool_falls_back() {
        let lib = library();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(lib.pick(TaskType::Dare, Difficulty::Safe, &mut rng), NO_CONTENT);
    }

    #[test]
    fn filtered_source_uses_bound_difficulty() {
        let lib = library();
        let source = lib.with_difficulty(Difficulty::Safe);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(source.random_content(TaskType::Truth, &mut rng), "t-safe");
    }

    #[test]
    fn default_library_has_safe_content() {
        let lib = ContentLibrary::default();
        assert!(!lib.truths.safe.is_empty());
        assert!(!lib.dares.safe.is_empty());
    }
}
