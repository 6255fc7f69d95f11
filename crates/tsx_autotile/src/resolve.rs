//! Autotile resolver: pick the tile whose Wang id fits a neighborhood
//!
//! Resolution is a pure lookup over the wang set's flat table. A tile is a
//! candidate when it carries every requested color; among candidates the
//! ones with the least terrain on wildcard positions win, so an exact match
//! always beats a looser one. Remaining ties are broken by declaration order,
//! by weight, or by a weighted random draw.

use crate::terrain::WangSet;
use crate::wang::WangId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// No tile in the set is compatible with the requested neighborhood
///
/// This is a valid answer, not a failure: the caller places its own
/// fallback tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no tile in wang set '{set}' matches {requested}")]
pub struct NoMatch {
    pub set: String,
    pub requested: WangId,
}

/// How to choose between equally good candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// First tile in declaration order, like the editor
    #[default]
    FirstDeclared,
    /// Largest weight; declaration order among equal weights
    HighestProbability,
}

/// A compatible tile and how well it fits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub tile_id: u32,
    /// Wildcard positions where the tile still carries terrain
    pub penalty: usize,
    pub weight: f32,
}

/// Resolve with the editor's precedence: best fit, first declared
pub fn resolve(set: &WangSet, neighborhood: &WangId) -> Result<u32, NoMatch> {
    Resolver::new(set).resolve(neighborhood)
}

/// Stateless lookup over one wang set
///
/// Every requested color is checked, including positions the set type
/// never uses: asking an edge set for corner terrain finds nothing. The
/// filler only constrains active positions, so it never hits this.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    set: &'a WangSet,
    tie_break: TieBreak,
}

impl<'a> Resolver<'a> {
    pub fn new(set: &'a WangSet) -> Self {
        Self {
            set,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn set(&self) -> &'a WangSet {
        self.set
    }

    /// Every compatible tile, in declaration order
    pub fn matches(&self, neighborhood: &WangId) -> Vec<Candidate> {
        self.set
            .tiles()
            .iter()
            .filter(|t| t.wang_id.satisfies(neighborhood))
            .map(|t| Candidate {
                tile_id: t.tile_id,
                penalty: t.wang_id.excess_over(neighborhood),
                weight: self.set.tile_weight(t),
            })
            .collect()
    }

    /// The minimum-penalty candidates, in declaration order
    pub fn candidates(&self, neighborhood: &WangId) -> Vec<Candidate> {
        let mut matches = self.matches(neighborhood);
        if let Some(best) = matches.iter().map(|c| c.penalty).min() {
            matches.retain(|c| c.penalty == best);
        }
        matches
    }

    /// Deterministic resolution using the configured tie-break
    pub fn resolve(&self, neighborhood: &WangId) -> Result<u32, NoMatch> {
        let candidates = self.candidates(neighborhood);
        let chosen = match self.tie_break {
            TieBreak::FirstDeclared => candidates.first(),
            TieBreak::HighestProbability => {
                candidates.iter().fold(None, |best: Option<&Candidate>, c| match best {
                    Some(b) if b.weight >= c.weight => Some(b),
                    _ => Some(c),
                })
            }
        };
        chosen.map(|c| c.tile_id).ok_or_else(|| self.no_match(neighborhood))
    }

    /// Weighted random choice among the best candidates
    pub fn resolve_random<R: Rng + ?Sized>(
        &self,
        neighborhood: &WangId,
        rng: &mut R,
    ) -> Result<u32, NoMatch> {
        let candidates = self.candidates(neighborhood);
        weighted_pick(&candidates, rng).ok_or_else(|| self.no_match(neighborhood))
    }

    fn no_match(&self, neighborhood: &WangId) -> NoMatch {
        tracing::debug!("Wang set '{}': no tile matches {}", self.set.name, neighborhood);
        NoMatch {
            set: self.set.name.clone(),
            requested: *neighborhood,
        }
    }
}

/// Pick a candidate with probability proportional to its weight
pub(crate) fn weighted_pick<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Option<u32> {
    if candidates.len() <= 1 {
        return candidates.first().map(|c| c.tile_id);
    }

    let total: f32 = candidates.iter().map(|c| c.weight).sum();
    if total <= 0.0 {
        return candidates.first().map(|c| c.tile_id);
    }

    let mut remaining = rng.gen::<f32>() * total;
    for candidate in candidates {
        if remaining < candidate.weight {
            return Some(candidate.tile_id);
        }
        remaining -= candidate.weight;
    }

    candidates.last().map(|c| c.tile_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::WangRuleTable;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const BG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../maps/bg.tsx"));
    const BG_ALT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../maps/bg-alt.tsx"));

    fn id(s: &str) -> WangId {
        WangId::parse(s).unwrap()
    }

    #[test]
    fn test_exact_neighborhood_returns_tile_40() {
        let rules = WangRuleTable::load(BG_ALT).unwrap();
        let grassy = rules.get("ground-grassy").unwrap();
        assert_eq!(resolve(grassy, &id("2,0,0,0,2,1,1,1")), Ok(40));
    }

    #[test]
    fn test_exact_match_beats_looser_candidates() {
        let rules = WangRuleTable::load(BG_ALT).unwrap();
        let grassy = rules.get("ground-grassy").unwrap();
        let resolver = Resolver::new(grassy);

        let all = resolver.matches(&id("2,0,0,0,2,1,1,1"));
        assert_eq!(all.iter().map(|c| c.tile_id).collect::<Vec<_>>(), vec![40, 72]);
        assert_eq!(all[0].penalty, 0);
        assert_eq!(all[1].penalty, 3);

        let best = resolver.candidates(&id("2,0,0,0,2,1,1,1"));
        assert_eq!(best.len(), 1);
    }

    #[test]
    fn test_first_declared_wins_ties() {
        let rules = WangRuleTable::load(BG).unwrap();
        let grassy = rules.get("ground-grassy").unwrap();
        // 37, 38 and 71 are all full grass
        assert_eq!(resolve(grassy, &WangId::filled(1)), Ok(37));
    }

    #[test]
    fn test_highest_probability_tie_break() {
        let rules = WangRuleTable::load(BG).unwrap();
        let grassy = rules.get("ground-grassy").unwrap();

        // 71 has weight 1.0, 37 and 38 have 1.5: first of the heaviest wins
        let resolver = Resolver::new(grassy).with_tie_break(TieBreak::HighestProbability);
        assert_eq!(resolver.resolve(&WangId::filled(1)), Ok(37));

        // 39 is the only exact fit despite its low weight
        assert_eq!(resolver.resolve(&id("1,1,1,0,0,0,1,1")), Ok(39));
    }

    #[test]
    fn test_wall_no_match() {
        let rules = WangRuleTable::load(BG).unwrap();
        let wall = rules.get("wall").unwrap();

        let request = WangId::filled(1);
        let err = resolve(wall, &request).unwrap_err();
        assert_eq!(
            err,
            NoMatch {
                set: "wall".to_string(),
                requested: request
            }
        );
        assert!(err.to_string().contains("wall"));

        let mut rng = SmallRng::seed_from_u64(7);
        assert!(Resolver::new(wall).resolve_random(&request, &mut rng).is_err());
    }

    #[test]
    fn test_inactive_positions_are_not_ignored() {
        let rules = WangRuleTable::load(BG).unwrap();
        let wall = rules.get("wall").unwrap();

        // Edge set tiles never carry corner terrain
        assert!(resolve(wall, &id("1,1,0,0,0,0,0,0")).is_err());
        assert_eq!(resolve(wall, &id("1,0,0,0,0,0,0,0")), Ok(65));
    }

    #[test]
    fn test_wall_wildcards() {
        let rules = WangRuleTable::load(BG).unwrap();
        let wall = rules.get("wall").unwrap();

        // Only the left edge is requested: the tile with nothing else wins
        assert_eq!(resolve(wall, &id("0,0,0,0,0,0,1,0")), Ok(3));
        assert_eq!(resolve(wall, &id("1,0,1,0,1,0,1,0")), Ok(34));
        assert_eq!(resolve(wall, &id("1,0,0,0,0,0,1,0")), Ok(67));
    }

    #[test]
    fn test_all_wildcards_prefers_least_terrain() {
        let rules = WangRuleTable::load(BG).unwrap();
        let wall = rules.get("wall").unwrap();
        let best = Resolver::new(wall).candidates(&WangId::WILDCARD);
        assert_eq!(
            best.iter().map(|c| c.tile_id).collect::<Vec<_>>(),
            vec![1, 3, 65, 67]
        );
    }

    #[test]
    fn test_random_resolution_is_seeded_and_bounded() {
        let rules = WangRuleTable::load(BG).unwrap();
        let grassy = rules.get("ground-grassy").unwrap();
        let resolver = Resolver::new(grassy);
        let request = WangId::filled(1);

        let draw = |seed: u64| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..32)
                .map(|_| resolver.resolve_random(&request, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };

        let first = draw(42);
        assert_eq!(first, draw(42));
        assert!(first.iter().all(|t| [37, 38, 71].contains(t)));
    }

    #[test]
    fn test_weighted_pick_edge_cases() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(weighted_pick(&[], &mut rng), None);

        let zero = [
            Candidate { tile_id: 4, penalty: 0, weight: 0.0 },
            Candidate { tile_id: 5, penalty: 0, weight: 0.0 },
        ];
        assert_eq!(weighted_pick(&zero, &mut rng), Some(4));

        let one_sided = [
            Candidate { tile_id: 4, penalty: 0, weight: 0.0 },
            Candidate { tile_id: 5, penalty: 0, weight: 3.0 },
        ];
        for _ in 0..16 {
            assert_eq!(weighted_pick(&one_sided, &mut rng), Some(5));
        }
    }
}
