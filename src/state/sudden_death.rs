use crate::state::{
    leaderboard::rank,
    quiz::{PlayerId, QuizSession},
};

/// Elimination mode restricting who may lock answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuddenDeath {
    allowed: Option<Vec<PlayerId>>,
}

impl SuddenDeath {
    /// Rebuild from persisted fields. An active round without a list allows nobody.
    pub fn restore(active: bool, allowed: Option<Vec<PlayerId>>) -> Self {
        Self {
            allowed: active.then(|| allowed.unwrap_or_default()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.allowed.is_some()
    }

    /// Eligible players, in ranking order at the time the round started.
    pub fn allowed(&self) -> Option<&[PlayerId]> {
        self.allowed.as_deref()
    }

    /// Whether `player_id` may submit answers right now.
    pub fn permits(&self, player_id: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(allowed) => allowed.iter().any(|candidate| candidate == player_id),
        }
    }

    pub fn clear(&mut self) {
        self.allowed = None;
    }
}

impl QuizSession {
    /// Activate sudden death and return the eligible players.
    ///
    /// Explicit ids are intersected with the roster. Otherwise the top `top_n` ranked players are
    /// taken, or the whole roster. Empty id lists and a zero `top_n` count as not given.
    pub fn start_sudden_death(
        &mut self,
        player_ids: Option<Vec<PlayerId>>,
        top_n: Option<usize>,
    ) -> Vec<PlayerId> {
        let allowed: Vec<PlayerId> = match (
            player_ids.filter(|ids| !ids.is_empty()),
            top_n.filter(|n| *n > 0),
        ) {
            (Some(ids), _) => {
                let mut allowed = Vec::with_capacity(ids.len());
                for id in ids {
                    if self.players.contains_key(&id) && !allowed.contains(&id) {
                        allowed.push(id);
                    }
                }
                allowed
            }
            (None, Some(n)) => rank(self.players.values())
                .into_iter()
                .take(n)
                .map(|player| player.id.clone())
                .collect(),
            (None, None) => rank(self.players.values())
                .into_iter()
                .map(|player| player.id.clone())
                .collect(),
        };
        self.sudden_death.allowed = Some(allowed.clone());
        allowed
    }

    pub fn stop_sudden_death(&mut self) {
        self.sudden_death.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::Player;

    fn session() -> QuizSession {
        let mut session = QuizSession::new("GLOBAL");
        for (id, score) in [("p1", 100), ("p2", 300), ("p3", 200)] {
            let mut player = Player::new(id.into(), id.into(), None, id.into());
            player.score = score;
            session.players.insert(id.into(), player);
        }
        session
    }

    #[test]
    fn explicit_ids_are_intersected_with_roster() {
        let mut session = session();
        let allowed =
            session.start_sudden_death(Some(vec!["p3".into(), "ghost".into(), "p3".into()]), Some(1));
        assert_eq!(allowed, ["p3"]);
        assert!(session.sudden_death.permits("p3"));
        assert!(!session.sudden_death.permits("p1"));
    }

    #[test]
    fn top_n_follows_leaderboard_order() {
        let mut session = session();
        assert_eq!(session.start_sudden_death(None, Some(2)), ["p2", "p3"]);
    }

    #[test]
    fn defaults_to_whole_roster() {
        let mut session = session();
        assert_eq!(session.start_sudden_death(Some(vec![]), Some(0)).len(), 3);
        assert!(session.sudden_death.is_active());
    }

    #[test]
    fn stop_lifts_the_restriction() {
        let mut session = session();
        session.start_sudden_death(Some(vec!["p1".into()]), None);
        session.stop_sudden_death();
        assert!(!session.sudden_death.is_active());
        assert!(session.sudden_death.permits("p2"));
    }
}
