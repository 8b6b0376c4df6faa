//! Achievement tiers and the award check run after every XP-bearing action.

use tracing::info;

use crate::data::{AppData, ContentType, User};

pub const XP_PER_LEVEL: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Track {
    FlashcardsFlipped,
    QuestionsCorrect,
    Streak,
    SummariesRead,
    MindMapsRead,
}

pub struct Tier {
    pub count: usize,
    pub title: &'static str,
}

const fn tier(count: usize, title: &'static str) -> Tier {
    Tier { count, title }
}

pub const FLASHCARDS_FLIPPED: &[Tier] = &[
    tier(10, "Aprendiz de Flashcards"),
    tier(25, "Praticante de Flashcards"),
    tier(50, "Adepto de Flashcards"),
    tier(100, "Mestre de Flashcards"),
    tier(150, "Sábio de Flashcards"),
    tier(200, "Lenda dos Flashcards"),
];

pub const QUESTIONS_CORRECT: &[Tier] = &[
    tier(10, "Primeiros Passos"),
    tier(25, "Estudante Dedicado"),
    tier(50, "Conhecedor"),
    tier(100, "Especialista"),
    tier(200, "Mestre das Questões"),
    tier(300, "Doutrinador"),
    tier(400, "Sábio das Questões"),
    tier(500, "Oráculo"),
];

pub const STREAK: &[Tier] = &[
    tier(5, "Embalado!"),
    tier(10, "Imparável!"),
    tier(15, "Invencível!"),
    tier(20, "Dominante!"),
    tier(25, "Lendário!"),
    tier(50, "Divino!"),
];

pub const SUMMARIES_READ: &[Tier] = &[
    tier(3, "Leitor Iniciante"),
    tier(5, "Leitor Atento"),
    tier(7, "Leitor Voraz"),
    tier(10, "Devorador de Livros"),
    tier(20, "Bibliotecário"),
    tier(30, "Arquivista"),
    tier(50, "Historiador"),
];

pub const MIND_MAPS_READ: &[Tier] = &[
    tier(3, "Visualizador Curioso"),
    tier(5, "Explorador Visual"),
    tier(7, "Cartógrafo do Saber"),
    tier(10, "Mapeador de Ideias"),
    tier(20, "Estrategista Visual"),
    tier(30, "Mestre dos Mapas"),
    tier(50, "Iluminado"),
];

impl Track {
    pub const ALL: [Track; 5] = [
        Track::FlashcardsFlipped,
        Track::QuestionsCorrect,
        Track::Streak,
        Track::SummariesRead,
        Track::MindMapsRead,
    ];

    pub fn tiers(self) -> &'static [Tier] {
        match self {
            Track::FlashcardsFlipped => FLASHCARDS_FLIPPED,
            Track::QuestionsCorrect => QUESTIONS_CORRECT,
            Track::Streak => STREAK,
            Track::SummariesRead => SUMMARIES_READ,
            Track::MindMapsRead => MIND_MAPS_READ,
        }
    }

    /// Current progress of `user` on this track.
    pub fn progress(self, user: &User, data: &AppData) -> usize {
        match self {
            Track::FlashcardsFlipped => data.read_count(&user.id, ContentType::Flashcard),
            Track::QuestionsCorrect => user.stats.correct_answers as usize,
            Track::Streak => user.stats.streak as usize,
            Track::SummariesRead => data.read_count(&user.id, ContentType::Summary),
            Track::MindMapsRead => data.read_count(&user.id, ContentType::MindMap),
        }
    }
}

pub fn level_for_xp(xp: i64) -> u32 {
    (xp.max(0) / XP_PER_LEVEL + 1) as u32
}

/// Returns `user` with every newly reached tier appended to its achievements
/// and its level recomputed from XP.
///
/// `data` must already reflect the action that triggered the check.
pub fn check_and_award(mut user: User, data: &AppData) -> User {
    for track in Track::ALL {
        let progress = track.progress(&user, data);

        for tier in track.tiers() {
            if progress >= tier.count && !user.achievements.iter().any(|title| title == tier.title) {
                info!(user = %user.pseudonym, achievement = tier.title, "achievement unlocked");
                user.achievements.push(tier.title.to_owned());
            }
        }
    }

    user.level = level_for_xp(user.xp);

    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{UserContentInteraction, UserStats};

    fn user() -> User {
        User {
            id: "u1".to_owned(),
            pseudonym: "ana".to_owned(),
            level: 1,
            xp: 0,
            achievements: vec![],
            stats: UserStats::default(),
        }
    }

    fn read(content_type: ContentType, n: usize) -> Vec<UserContentInteraction> {
        (0..n)
            .map(|i| {
                let mut interaction = UserContentInteraction::new("u1", &i.to_string(), content_type);
                interaction.is_read = true;
                interaction
            })
            .collect()
    }

    #[test]
    fn test_awards_every_reached_tier_once() {
        let mut user = user();
        user.stats.correct_answers = 27;
        user.stats.streak = 5;

        let data = AppData {
            user_content_interactions: read(ContentType::Summary, 3),
            ..Default::default()
        };

        let user = check_and_award(user, &data);
        assert_eq!(
            user.achievements,
            vec!["Primeiros Passos", "Estudante Dedicado", "Embalado!", "Leitor Iniciante"]
        );

        let again = check_and_award(user.clone(), &data);
        assert_eq!(again.achievements, user.achievements);
    }

    #[test]
    fn test_only_counts_read_items_of_the_user() {
        let mut interactions = read(ContentType::MindMap, 2);
        let mut other = UserContentInteraction::new("u2", "x", ContentType::MindMap);
        other.is_read = true;
        interactions.push(other);
        interactions.push(UserContentInteraction::new("u1", "y", ContentType::MindMap));

        let data = AppData {
            user_content_interactions: interactions,
            ..Default::default()
        };

        assert!(check_and_award(user(), &data).achievements.is_empty());
    }

    #[test]
    fn test_level_follows_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(250), 3);
        assert_eq!(level_for_xp(-20), 1);

        let mut user = user();
        user.xp = 310;
        assert_eq!(check_and_award(user, &AppData::default()).level, 4);
    }
}
