use crate::session::SessionTable;
use armada_core::filter::extract_session_id;
use armada_core::{Out, Pool};
use rand::Rng;
use tracing::debug;

/// Choose an upstream Out for a request within its resolved pool.
///
/// A non-empty session id embedded in the filter pins the session to the
/// previously chosen domain while that domain is still in the pool;
/// otherwise the choice is weighted-random over the pool's Outs. A pool
/// whose total weight is zero is treated as uniform.
pub fn select_out<'p>(
    pool: &'p Pool,
    filter: &str,
    sessions: &SessionTable,
    rng: &mut impl Rng,
) -> Option<&'p Out> {
    if pool.outs.is_empty() {
        return None;
    }

    let session_id = extract_session_id(filter);

    if let Some(domain) = sessions.get(session_id) {
        if let Some(out) = pool.find_out(&domain) {
            return Some(out);
        }
        debug!(session_id, domain = %domain, pool = %pool.name, "Pinned upstream left the pool; reselecting");
    }

    let out = weighted_choice(&pool.outs, rng);
    sessions.record(session_id, &out.domain);
    Some(out)
}

fn weighted_choice<'a>(outs: &'a [Out], rng: &mut impl Rng) -> &'a Out {
    let total: u64 = outs.iter().map(|o| o.weight as u64).sum();
    if total == 0 {
        return &outs[rng.gen_range(0..outs.len())];
    }
    let mut roll = rng.gen_range(0..total);
    for out in outs {
        let weight = out.weight as u64;
        if roll < weight {
            return out;
        }
        roll -= weight;
    }
    // unreachable for roll < total; guard for the last slot anyway
    &outs[outs.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn make_pool(domains: &[(&str, u32)]) -> Pool {
        Pool {
            name: "eu1".into(),
            region: "eu".into(),
            subdomain: "eu1.x".into(),
            port_start: 6000,
            port_end: 6000,
            outs: domains
                .iter()
                .map(|(domain, weight)| Out {
                    format: "u:p-%s".into(),
                    upstream_port: 6502,
                    domain: (*domain).into(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let pool = make_pool(&[]);
        let sessions = SessionTable::new();
        assert!(select_out(&pool, "-res-de", &sessions, &mut rng()).is_none());
    }

    #[test]
    fn sticky_session_returns_same_out() {
        let pool = make_pool(&[("a.ex", 1), ("b.ex", 1), ("c.ex", 1)]);
        let sessions = SessionTable::new();
        let mut r = rng();

        let first = select_out(&pool, "-res-de-sid-12345678", &sessions, &mut r)
            .unwrap()
            .domain
            .clone();
        for _ in 0..20 {
            let again = select_out(&pool, "-res-de-sid-12345678", &sessions, &mut r).unwrap();
            assert_eq!(again.domain, first);
        }
    }

    #[test]
    fn sticky_entry_is_recorded_in_table() {
        let pool = make_pool(&[("a.ex", 1)]);
        let sessions = SessionTable::new();
        select_out(&pool, "-res-de-sid-87654321", &sessions, &mut rng()).unwrap();
        assert_eq!(sessions.get("87654321").as_deref(), Some("a.ex"));
    }

    #[test]
    fn non_sticky_filter_records_nothing() {
        let pool = make_pool(&[("a.ex", 1)]);
        let sessions = SessionTable::new();
        select_out(&pool, "-res-de", &sessions, &mut rng()).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn vanished_pin_falls_through_to_fresh_selection() {
        let pool = make_pool(&[("a.ex", 1)]);
        let sessions = SessionTable::new();
        sessions.record("12345678", "gone.ex");

        let out = select_out(&pool, "-sid-12345678", &sessions, &mut rng()).unwrap();
        assert_eq!(out.domain, "a.ex");
        // and the pin is rewritten to the new choice
        assert_eq!(sessions.get("12345678").as_deref(), Some("a.ex"));
    }

    #[test]
    fn weighted_choice_respects_weights() {
        let pool = make_pool(&[("light.ex", 1), ("heavy.ex", 9)]);
        let sessions = SessionTable::new();
        let mut r = rng();

        let mut heavy = 0usize;
        for _ in 0..1000 {
            let out = select_out(&pool, "-res-de", &sessions, &mut r).unwrap();
            if out.domain == "heavy.ex" {
                heavy += 1;
            }
        }
        assert!(
            heavy > 800 && heavy < 980,
            "expected ~900 heavy picks, got {heavy}"
        );
    }

    #[test]
    fn zero_total_weight_degrades_to_uniform() {
        let pool = make_pool(&[("a.ex", 0), ("b.ex", 0)]);
        let sessions = SessionTable::new();
        let mut r = rng();

        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..200 {
            match select_out(&pool, "", &sessions, &mut r).unwrap().domain.as_str() {
                "a.ex" => seen_a = true,
                "b.ex" => seen_b = true,
                other => panic!("unexpected domain {other}"),
            }
        }
        assert!(seen_a && seen_b);
    }

    #[test]
    fn concurrent_new_sessions_race_is_benign() {
        // Two "racing" selections for the same fresh id may each pick an
        // Out; the table ends up with whichever wrote last, and both
        // picks are valid members of the pool.
        let pool = make_pool(&[("a.ex", 1), ("b.ex", 1)]);
        let sessions = SessionTable::new();
        let mut r = rng();

        select_out(&pool, "-sid-11112222", &sessions, &mut r).unwrap();
        let pinned = sessions.get("11112222").unwrap();
        assert!(pool.find_out(&pinned).is_some());
    }
}
