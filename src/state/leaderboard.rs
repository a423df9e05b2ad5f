//! Leaderboard projection, computed fresh from the roster on every request

use crate::protocol::LeaderboardEntry;
use crate::types::Team;

/// Rank teams by score, highest first. `teams` must be in join order: the sort is stable,
/// so tied teams keep the order in which they joined.
pub fn project(teams: &[Team]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Team> = teams.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
        .into_iter()
        .map(|t| LeaderboardEntry {
            name: t.name.clone(),
            score: t.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str, score: i64) -> Team {
        Team {
            team_id: name.to_lowercase(),
            name: name.to_string(),
            score,
            connection: None,
        }
    }

    fn names(board: &[LeaderboardEntry]) -> Vec<&str> {
        board.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_ties_keep_join_order() {
        let teams = vec![team("A", 5), team("B", 5), team("C", 2)];
        assert_eq!(names(&project(&teams)), vec!["A", "B", "C"]);

        let teams = vec![team("Zulu", 5), team("Alpha", 5)];
        assert_eq!(names(&project(&teams)), vec!["Zulu", "Alpha"]);
    }

    #[test]
    fn test_higher_score_first() {
        let teams = vec![team("A", 1), team("B", 4), team("C", 2)];
        let board = project(&teams);
        assert_eq!(names(&board), vec!["B", "C", "A"]);
        assert_eq!(board[0].score, 4);
    }

    #[test]
    fn test_empty_roster() {
        assert!(project(&[]).is_empty());
    }
}
