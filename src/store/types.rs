//! Core data types for match records
//!
//! This module defines the fundamental types consumed by the index, query
//! and analytics layers:
//! - `Match`: One completed game, immutable once stored
//! - `Participant`: One player's slot within a match
//! - `normalize_role`: Canonical role names for indexing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Team ids as the upstream API reports them
pub const BLUE_TEAM: i32 = 100;
pub const RED_TEAM: i32 = 200;

/// One player's slot within a match
///
/// Carries the raw per-game stat counters; derived statistics (KDA,
/// win rates, trends) are computed downstream by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    /// Player identity in the upstream game API
    pub puuid: String,
    /// Champion played this game
    pub champion_id: i32,
    /// Team id (100 = blue side, 200 = red side)
    pub team_id: i32,
    /// Normalized role: TOP, JUNGLE, MID, ADC or SUPPORT
    pub role: String,
    /// Whether this participant's team won
    pub win: bool,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub damage_dealt: u64,
    #[serde(default)]
    pub gold_earned: u64,
    #[serde(default)]
    pub vision_score: u32,
    #[serde(default)]
    pub cs: u32,
}

impl Participant {
    /// Create a participant with required fields
    pub fn new(
        puuid: impl Into<String>,
        champion_id: i32,
        team_id: i32,
        role: impl AsRef<str>,
    ) -> Self {
        Self {
            puuid: puuid.into(),
            champion_id,
            team_id,
            role: normalize_role(role.as_ref()),
            win: false,
            kills: 0,
            deaths: 0,
            assists: 0,
            damage_dealt: 0,
            gold_earned: 0,
            vision_score: 0,
            cs: 0,
        }
    }

    /// Builder: mark as winner
    pub fn win(mut self, win: bool) -> Self {
        self.win = win;
        self
    }

    /// Builder: set kill/death/assist counters
    pub fn kda(mut self, kills: u32, deaths: u32, assists: u32) -> Self {
        self.kills = kills;
        self.deaths = deaths;
        self.assists = assists;
        self
    }

    /// Builder: set gold and damage counters
    pub fn economy(mut self, gold_earned: u64, damage_dealt: u64, cs: u32) -> Self {
        self.gold_earned = gold_earned;
        self.damage_dealt = damage_dealt;
        self.cs = cs;
        self
    }

    /// Kill participation numerator used by the analytics engine
    pub fn kda_ratio(&self) -> f64 {
        let takedowns = (self.kills + self.assists) as f64;
        if self.deaths == 0 {
            takedowns
        } else {
            takedowns / self.deaths as f64
        }
    }
}

/// One completed game, immutable once stored
///
/// A well-formed match has exactly 10 participants split 5/5 across the
/// two team ids. Violations are a data-quality issue upstream and are not
/// enforced here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    /// Unique match identifier (e.g. "NA1_4372810293")
    pub match_id: String,
    /// Game creation timestamp in epoch milliseconds
    pub game_creation: i64,
    /// Game duration in seconds
    #[serde(default)]
    pub game_duration: i64,
    /// Queue id (e.g. 420 = ranked solo, 440 = ranked flex)
    pub queue_id: i32,
    /// Map id (11 = Summoner's Rift)
    #[serde(default = "default_map_id")]
    pub map_id: i32,
    /// Team id of the winning side
    pub winning_team: i32,
    /// Ordered participant list
    pub participants: Vec<Participant>,
}

fn default_map_id() -> i32 {
    11
}

impl Match {
    /// Create a match with required fields and no participants yet
    pub fn new(match_id: impl Into<String>, game_creation: i64, queue_id: i32) -> Self {
        Self {
            match_id: match_id.into(),
            game_creation,
            game_duration: 0,
            queue_id,
            map_id: default_map_id(),
            winning_team: BLUE_TEAM,
            participants: Vec::new(),
        }
    }

    /// Builder: set game duration in seconds
    pub fn duration(mut self, seconds: i64) -> Self {
        self.game_duration = seconds;
        self
    }

    /// Builder: set the winning team, updating participant win flags
    pub fn winner(mut self, team_id: i32) -> Self {
        self.winning_team = team_id;
        for p in &mut self.participants {
            p.win = p.team_id == team_id;
        }
        self
    }

    /// Builder: add a participant
    pub fn participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    /// Game creation as a UTC datetime, if representable
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.game_creation)
    }

    /// Calendar-day bucket (`YYYY-MM-DD`, UTC) used by the date index
    pub fn date_bucket(&self) -> String {
        date_bucket(self.game_creation)
    }

    /// Find a participant by puuid
    pub fn participant_by_puuid(&self, puuid: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.puuid == puuid)
    }

    /// All puuids appearing in this match
    pub fn puuids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.puuid.as_str())
    }
}

/// Calendar-day bucket for an epoch-millisecond timestamp
pub fn date_bucket(epoch_millis: i64) -> String {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "0000-00-00".to_string())
}

/// Normalize upstream role/lane strings to the canonical five roles
///
/// The upstream API mixes lane names (MIDDLE, BOTTOM, UTILITY) and role
/// names (MID, ADC, SUPPORT) depending on endpoint version.
pub fn normalize_role(raw: &str) -> String {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TOP" => "TOP".to_string(),
        "JUNGLE" | "JGL" => "JUNGLE".to_string(),
        "MIDDLE" | "MID" => "MID".to_string(),
        "BOTTOM" | "BOT" | "ADC" | "CARRY" => "ADC".to_string(),
        "UTILITY" | "SUPPORT" | "SUP" => "SUPPORT".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_builder() {
        let p = Participant::new("puuid-1", 103, BLUE_TEAM, "MIDDLE")
            .win(true)
            .kda(7, 2, 9);

        assert_eq!(p.role, "MID");
        assert!(p.win);
        assert_eq!(p.kda_ratio(), 8.0);
    }

    #[test]
    fn test_kda_ratio_zero_deaths() {
        let p = Participant::new("puuid-1", 103, BLUE_TEAM, "MID").kda(4, 0, 6);
        assert_eq!(p.kda_ratio(), 10.0);
    }

    #[test]
    fn test_match_winner_sets_participant_flags() {
        let m = Match::new("NA1_1", 1_700_000_000_000, 420)
            .participant(Participant::new("p1", 10, BLUE_TEAM, "TOP"))
            .participant(Participant::new("p2", 20, RED_TEAM, "TOP"))
            .winner(RED_TEAM);

        assert!(!m.participants[0].win);
        assert!(m.participants[1].win);
        assert_eq!(m.winning_team, RED_TEAM);
    }

    #[test]
    fn test_date_bucket() {
        // 2023-11-14T22:13:20Z
        assert_eq!(date_bucket(1_700_000_000_000), "2023-11-14");
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role("MIDDLE"), "MID");
        assert_eq!(normalize_role("bottom"), "ADC");
        assert_eq!(normalize_role("UTILITY"), "SUPPORT");
        assert_eq!(normalize_role("JUNGLE"), "JUNGLE");
        assert_eq!(normalize_role("TOP"), "TOP");
    }

    #[test]
    fn test_match_serialization_round_trip() {
        let m = Match::new("NA1_1", 1_700_000_000_000, 420)
            .duration(1843)
            .participant(Participant::new("p1", 10, BLUE_TEAM, "TOP").kda(3, 1, 4))
            .winner(BLUE_TEAM);

        let json = serde_json::to_string(&m).unwrap();
        let restored: Match = serde_json::from_str(&json).unwrap();
        assert_eq!(m, restored);
    }
}
