//! Multi-key match index
//!
//! Maps each indexed dimension to the set of match ids carrying that value.
//! Pure data structure: no I/O, no store access. A match added to the store
//! but not yet indexed (or vice versa) is an accepted transient, resolved by
//! `rebuild` rather than automatic invalidation.
//!
//! Date-range filtering is deliberately not applied here - a day-bucketed
//! index cannot cheaply answer open-ended ranges, so the query layer
//! re-validates timestamps on the hydrated candidates.

use crate::index::{IndexError, IndexResult, IndexStats};
use crate::query::AnalyticsFilters;
use crate::store::{normalize_role, Match};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct IndexInner {
    by_player: HashMap<String, HashSet<String>>,
    by_champion: HashMap<i32, HashSet<String>>,
    by_role: HashMap<String, HashSet<String>>,
    by_queue: HashMap<i32, HashSet<String>>,
    by_date: HashMap<String, HashSet<String>>,
    by_player_champion: HashMap<(String, i32), HashSet<String>>,
    by_player_role: HashMap<(String, String), HashSet<String>>,
    by_champion_role: HashMap<(i32, String), HashSet<String>>,
    by_player_champion_role: HashMap<(String, i32, String), HashSet<String>>,
    total_matches_indexed: u64,
}

/// Thread-safe multi-key index over match ids
///
/// All operations take a single coarse lock; index work is in-memory and
/// O(participants), so serializing access is acceptable.
#[derive(Debug, Default)]
pub struct MatchIndex {
    inner: RwLock<IndexInner>,
}

impl MatchIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one match
    ///
    /// Set inserts are idempotent, but the `total_matches_indexed` counter
    /// increments unconditionally - do not call twice for the same match if
    /// accurate counts matter.
    pub fn add_match(&self, m: &Match) -> IndexResult<()> {
        let mut inner = self.write()?;
        Self::add_locked(&mut inner, m);
        Ok(())
    }

    /// Remove one match from every index
    pub fn remove_match(&self, m: &Match) -> IndexResult<()> {
        let mut inner = self.write()?;
        let id = m.match_id.as_str();

        discard_from(&mut inner.by_queue, &m.queue_id, id);
        discard_from(&mut inner.by_date, &m.date_bucket(), id);

        for p in &m.participants {
            let role = normalize_role(&p.role);
            discard_from(&mut inner.by_player, &p.puuid, id);
            discard_from(&mut inner.by_champion, &p.champion_id, id);
            discard_from(&mut inner.by_role, &role, id);
            discard_from(
                &mut inner.by_player_champion,
                &(p.puuid.clone(), p.champion_id),
                id,
            );
            discard_from(
                &mut inner.by_player_role,
                &(p.puuid.clone(), role.clone()),
                id,
            );
            discard_from(
                &mut inner.by_champion_role,
                &(p.champion_id, role.clone()),
                id,
            );
            discard_from(
                &mut inner.by_player_champion_role,
                &(p.puuid.clone(), p.champion_id, role),
                id,
            );
        }
        Ok(())
    }

    /// Find match ids satisfying the indexable filter dimensions
    ///
    /// Filters apply in player -> champion -> role -> queue order, each
    /// intersecting the running candidate set. Within one dimension,
    /// multiple values union. No indexable dimension requested returns the
    /// empty set ("unconstrained but nothing requested").
    pub fn find_matches(&self, filters: &AnalyticsFilters) -> IndexResult<HashSet<String>> {
        let inner = self.read()?;

        let roles: Vec<String> = filters
            .roles
            .iter()
            .map(|r| normalize_role(r))
            .collect();

        let mut candidates: Option<HashSet<String>> = None;
        let mut player_done = false;
        let mut champion_done = false;
        let mut role_done = false;

        // Composite fast paths for single-valued combined filters
        if filters.player_puuids.len() == 1 && filters.champions.len() == 1 && roles.len() == 1 {
            let key = (
                filters.player_puuids[0].clone(),
                filters.champions[0],
                roles[0].clone(),
            );
            candidates = Some(lookup(&inner.by_player_champion_role, &key));
            player_done = true;
            champion_done = true;
            role_done = true;
        } else if filters.player_puuids.len() == 1 && filters.champions.len() == 1 {
            let key = (filters.player_puuids[0].clone(), filters.champions[0]);
            candidates = Some(lookup(&inner.by_player_champion, &key));
            player_done = true;
            champion_done = true;
        } else if filters.player_puuids.len() == 1 && roles.len() == 1 {
            let key = (filters.player_puuids[0].clone(), roles[0].clone());
            candidates = Some(lookup(&inner.by_player_role, &key));
            player_done = true;
            role_done = true;
        } else if filters.champions.len() == 1 && roles.len() == 1 {
            let key = (filters.champions[0], roles[0].clone());
            candidates = Some(lookup(&inner.by_champion_role, &key));
            champion_done = true;
            role_done = true;
        }

        if !player_done && !filters.player_puuids.is_empty() {
            let union = union_lookup(&inner.by_player, filters.player_puuids.iter());
            candidates = intersect(candidates, union);
        }
        if !champion_done && !filters.champions.is_empty() {
            let union = union_lookup(&inner.by_champion, filters.champions.iter());
            candidates = intersect(candidates, union);
        }
        if !role_done && !roles.is_empty() {
            let union = union_lookup(&inner.by_role, roles.iter());
            candidates = intersect(candidates, union);
        }
        if !filters.queues.is_empty() {
            let union = union_lookup(&inner.by_queue, filters.queues.iter());
            candidates = intersect(candidates, union);
        }

        Ok(candidates.unwrap_or_default())
    }

    /// Drop everything and re-index the given matches
    pub fn rebuild(&self, matches: &[Match]) -> IndexResult<()> {
        let mut inner = self.write()?;
        *inner = IndexInner::default();
        for m in matches {
            Self::add_locked(&mut inner, m);
        }
        Ok(())
    }

    /// Snapshot of index contents
    pub fn stats(&self) -> IndexResult<IndexStats> {
        let inner = self.read()?;
        Ok(IndexStats {
            players: inner.by_player.len(),
            champions: inner.by_champion.len(),
            roles: inner.by_role.len(),
            queues: inner.by_queue.len(),
            days: inner.by_date.len(),
            composite_keys: inner.by_player_champion.len()
                + inner.by_player_role.len()
                + inner.by_champion_role.len()
                + inner.by_player_champion_role.len(),
            total_matches_indexed: inner.total_matches_indexed,
        })
    }

    fn add_locked(inner: &mut IndexInner, m: &Match) {
        let id = m.match_id.as_str();

        insert_into(&mut inner.by_queue, m.queue_id, id);
        insert_into(&mut inner.by_date, m.date_bucket(), id);

        for p in &m.participants {
            let role = normalize_role(&p.role);
            insert_into(&mut inner.by_player, p.puuid.clone(), id);
            insert_into(&mut inner.by_champion, p.champion_id, id);
            insert_into(&mut inner.by_role, role.clone(), id);
            insert_into(
                &mut inner.by_player_champion,
                (p.puuid.clone(), p.champion_id),
                id,
            );
            insert_into(
                &mut inner.by_player_role,
                (p.puuid.clone(), role.clone()),
                id,
            );
            insert_into(
                &mut inner.by_champion_role,
                (p.champion_id, role.clone()),
                id,
            );
            insert_into(
                &mut inner.by_player_champion_role,
                (p.puuid.clone(), p.champion_id, role),
                id,
            );
        }

        inner.total_matches_indexed += 1;
    }

    fn read(&self) -> IndexResult<std::sync::RwLockReadGuard<'_, IndexInner>> {
        self.inner.read().map_err(|e| IndexError::Lock(e.to_string()))
    }

    fn write(&self) -> IndexResult<std::sync::RwLockWriteGuard<'_, IndexInner>> {
        self.inner
            .write()
            .map_err(|e| IndexError::Lock(e.to_string()))
    }
}

fn insert_into<K: Eq + Hash>(map: &mut HashMap<K, HashSet<String>>, key: K, id: &str) {
    map.entry(key).or_default().insert(id.to_string());
}

fn discard_from<K: Eq + Hash>(map: &mut HashMap<K, HashSet<String>>, key: &K, id: &str) {
    if let Some(set) = map.get_mut(key) {
        set.remove(id);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

fn lookup<K: Eq + Hash>(map: &HashMap<K, HashSet<String>>, key: &K) -> HashSet<String> {
    map.get(key).cloned().unwrap_or_default()
}

fn union_lookup<'a, K: Eq + Hash + 'a>(
    map: &HashMap<K, HashSet<String>>,
    keys: impl Iterator<Item = &'a K>,
) -> HashSet<String> {
    let mut result = HashSet::new();
    for key in keys {
        if let Some(set) = map.get(key) {
            result.extend(set.iter().cloned());
        }
    }
    result
}

fn intersect(
    candidates: Option<HashSet<String>>,
    other: HashSet<String>,
) -> Option<HashSet<String>> {
    Some(match candidates {
        Some(existing) => existing.intersection(&other).cloned().collect(),
        None => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Participant, BLUE_TEAM, RED_TEAM};

    fn sample_match(id: &str, puuid: &str, champion: i32, role: &str) -> Match {
        Match::new(id, 1_700_000_000_000, 420)
            .participant(Participant::new(puuid, champion, BLUE_TEAM, role))
            .participant(Participant::new("opponent", 999, RED_TEAM, role))
            .winner(BLUE_TEAM)
    }

    #[test]
    fn test_add_and_find_by_player() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();
        index.add_match(&sample_match("m2", "p2", 20, "TOP")).unwrap();
        index.add_match(&sample_match("m3", "p1", 10, "MID")).unwrap();

        let filters = AnalyticsFilters::new().player("p1");
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains("m1"));
        assert!(found.contains("m3"));

        let filters = AnalyticsFilters::new().champion(20);
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains("m2"));
    }

    #[test]
    fn test_no_filters_returns_empty() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();

        let found = index.find_matches(&AnalyticsFilters::new()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_composite_player_champion() {
        let index = MatchIndex::new();
        // p1 on champion 10, p2 on champion 10 in a different match
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();
        index.add_match(&sample_match("m2", "p2", 10, "MID")).unwrap();

        let filters = AnalyticsFilters::new().player("p1").champion(10);
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains("m1"));
    }

    #[test]
    fn test_intersection_across_dimensions() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();
        index.add_match(&sample_match("m2", "p1", 10, "TOP")).unwrap();

        let filters = AnalyticsFilters::new()
            .player("p1")
            .champion(10)
            .role("MID");
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains("m1"));
    }

    #[test]
    fn test_union_within_dimension() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();
        index.add_match(&sample_match("m2", "p2", 20, "TOP")).unwrap();
        index.add_match(&sample_match("m3", "p3", 30, "ADC")).unwrap();

        let filters = AnalyticsFilters::new().players(["p1", "p2"]);
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains("m1"));
        assert!(found.contains("m2"));
    }

    #[test]
    fn test_queue_filter() {
        let index = MatchIndex::new();
        let solo = sample_match("m1", "p1", 10, "MID");
        let mut flex = sample_match("m2", "p1", 10, "MID");
        flex.queue_id = 440;
        index.add_match(&solo).unwrap();
        index.add_match(&flex).unwrap();

        let filters = AnalyticsFilters::new().player("p1").queue(440);
        let found = index.find_matches(&filters).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains("m2"));
    }

    #[test]
    fn test_remove_match_clears_all_indexes() {
        let index = MatchIndex::new();
        let m = sample_match("m1", "p1", 10, "MID");
        index.add_match(&m).unwrap();
        index.remove_match(&m).unwrap();

        for filters in [
            AnalyticsFilters::new().player("p1"),
            AnalyticsFilters::new().champion(10),
            AnalyticsFilters::new().role("MID"),
            AnalyticsFilters::new().queue(420),
            AnalyticsFilters::new().player("p1").champion(10),
            AnalyticsFilters::new().player("p1").role("MID"),
            AnalyticsFilters::new().champion(10).role("MID"),
            AnalyticsFilters::new().player("p1").champion(10).role("MID"),
        ] {
            assert!(
                index.find_matches(&filters).unwrap().is_empty(),
                "stale entry for {:?}",
                filters
            );
        }

        // Empty keys are pruned entirely
        let stats = index.stats().unwrap();
        assert_eq!(stats.players, 0);
        assert_eq!(stats.champions, 0);
        assert_eq!(stats.composite_keys, 0);
    }

    #[test]
    fn test_remove_absent_match_is_noop() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();
        // Never indexed; discard must not error
        index.remove_match(&sample_match("m2", "p2", 20, "TOP")).unwrap();

        let found = index
            .find_matches(&AnalyticsFilters::new().player("p1"))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_counter_increments_unconditionally() {
        let index = MatchIndex::new();
        let m = sample_match("m1", "p1", 10, "MID");
        index.add_match(&m).unwrap();
        index.add_match(&m).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_matches_indexed, 2);
        // But set membership stayed deduplicated
        let found = index
            .find_matches(&AnalyticsFilters::new().player("p1"))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_rebuild() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("m1", "p1", 10, "MID")).unwrap();

        let replacement = [
            sample_match("m2", "p2", 20, "TOP"),
            sample_match("m3", "p3", 30, "ADC"),
        ];
        index.rebuild(&replacement).unwrap();

        assert!(index
            .find_matches(&AnalyticsFilters::new().player("p1"))
            .unwrap()
            .is_empty());
        assert_eq!(
            index
                .find_matches(&AnalyticsFilters::new().player("p2"))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(index.stats().unwrap().total_matches_indexed, 2);
    }

    #[test]
    fn test_two_players_disjoint_lookups() {
        let index = MatchIndex::new();
        index.add_match(&sample_match("match1", "p1", 10, "MID")).unwrap();
        index.add_match(&sample_match("match2", "p2", 20, "TOP")).unwrap();
        index.add_match(&sample_match("match3", "p1", 10, "MID")).unwrap();

        let by_player = index
            .find_matches(&AnalyticsFilters::new().player("p1"))
            .unwrap();
        assert_eq!(
            by_player,
            HashSet::from(["match1".to_string(), "match3".to_string()])
        );

        let by_champion = index
            .find_matches(&AnalyticsFilters::new().champion(20))
            .unwrap();
        assert_eq!(by_champion, HashSet::from(["match2".to_string()]));
    }
}
