use std::cmp::Ordering;

use crate::{
    dto::events::LeaderboardEntry,
    state::quiz::{Player, QuizSession},
};

/// Total leaderboard order: score desc, firsts desc, cumulative time asc, name asc.
///
/// The id is the last resort so players with identical statistics still sort reproducibly.
pub fn leaderboard_order(a: &Player, b: &Player) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.correct_firsts.cmp(&a.correct_firsts))
        .then_with(|| a.cumulative_answer_time.total_cmp(&b.cumulative_answer_time))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank players best first.
pub fn rank<'a>(players: impl IntoIterator<Item = &'a Player>) -> Vec<&'a Player> {
    let mut ranked: Vec<&Player> = players.into_iter().collect();
    ranked.sort_by(|a, b| leaderboard_order(a, b));
    ranked
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

impl From<&Player> for LeaderboardEntry {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            email: player.email.clone(),
            score: player.score,
            participant_code: player.participant_code.clone(),
            firsts: player.correct_firsts,
            cum_time: round_millis(player.cumulative_answer_time),
        }
    }
}

impl QuizSession {
    /// Ranked roster projected as leaderboard rows.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        rank(self.players.values())
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect()
    }

    /// Zero every player's score and tie-break statistics.
    pub fn reset_scores(&mut self) {
        for player in self.players.values_mut() {
            player.score = 0;
            player.correct_firsts = 0;
            player.cumulative_answer_time = 0.0;
        }
    }

    /// Overwrite scores from a stored leaderboard, matching on participant code.
    ///
    /// Players absent from the snapshot drop to zero.
    pub fn apply_score_snapshot<'a>(
        &mut self,
        rows: impl IntoIterator<Item = (&'a str, i64)>,
    ) -> usize {
        let scores: std::collections::HashMap<String, i64> = rows
            .into_iter()
            .filter(|(code, _)| !code.trim().is_empty())
            .map(|(code, score)| (code.trim().to_lowercase(), score))
            .collect();
        let mut matched = 0;
        for player in self.players.values_mut() {
            let code = player.participant_code.trim().to_lowercase();
            match scores.get(&code) {
                Some(score) => {
                    player.score = *score;
                    matched += 1;
                }
                None => player.score = 0,
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str, score: i64, firsts: u32, cum: f64) -> Player {
        let mut player = Player::new(id.into(), name.into(), None, format!("{id}@quiz"));
        player.score = score;
        player.correct_firsts = firsts;
        player.cumulative_answer_time = cum;
        player
    }

    fn ids(ranked: &[&Player]) -> Vec<String> {
        ranked.iter().map(|player| player.id.clone()).collect()
    }

    #[test]
    fn ties_fall_through_firsts_time_then_name() {
        let players = vec![
            player("a", "Zed", 500, 1, 3.0),
            player("b", "Amy", 500, 1, 3.0),
            player("c", "Bob", 500, 2, 9.0),
            player("d", "Cat", 500, 1, 1.5),
            player("e", "Dan", 900, 0, 20.0),
        ];
        let ranked = rank(&players);
        assert_eq!(ids(&ranked), ["e", "c", "d", "b", "a"]);
    }

    #[test]
    fn ranking_is_reproducible_for_identical_tuples() {
        let first = vec![player("x", "Sam", 100, 0, 1.0), player("y", "Sam", 100, 0, 1.0)];
        let second = vec![player("y", "Sam", 100, 0, 1.0), player("x", "Sam", 100, 0, 1.0)];
        assert_eq!(ids(&rank(&first)), ids(&rank(&second)));
    }

    #[test]
    fn cumulative_time_is_rounded_to_millis() {
        let entry = LeaderboardEntry::from(&player("a", "Ann", 0, 0, 1.23456));
        assert_eq!(entry.cum_time, 1.235);
    }

    #[test]
    fn snapshot_scores_match_on_participant_code() {
        let mut session = QuizSession::new("GLOBAL");
        session.players.insert("a".into(), player("a", "Ann", 10, 2, 1.0));
        session.players.insert("b".into(), player("b", "Ben", 20, 0, 0.0));

        let matched = session.apply_score_snapshot([("A@QUIZ", 700), ("nobody@quiz", 50)]);
        assert_eq!(matched, 1);
        assert_eq!(session.players["a"].score, 700);
        assert_eq!(session.players["a"].correct_firsts, 2);
        assert_eq!(session.players["b"].score, 0);
    }

    #[test]
    fn reset_scores_zeroes_every_statistic() {
        let mut session = QuizSession::new("GLOBAL");
        session.players.insert("a".into(), player("a", "Ann", 10, 2, 1.0));
        session.reset_scores();
        let ann = &session.players["a"];
        assert_eq!((ann.score, ann.correct_firsts, ann.cumulative_answer_time), (0, 0, 0.0));
    }
}
