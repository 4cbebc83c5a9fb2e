use armada_core::fleet::{Country, Region, WorkerNode};
use armada_core::{ArmadaError, Pool, User};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct Maps {
    users: HashMap<String, User>,
    pools: HashMap<String, Pool>,
    workers: HashMap<String, WorkerNode>,
    regions: HashMap<String, Region>,
    countries: HashMap<String, Country>,
}

/// The captain's authoritative in-memory catalog.
///
/// A single reader-writer lock guards every map: readers run in
/// parallel, any mutation excludes them. Updates are copy-on-write —
/// the mutator runs on a clone, which replaces the stored entry only
/// when it returns `Ok`, so a failed mutation is never observable.
#[derive(Clone, Default)]
pub struct Catalog {
    inner: Arc<RwLock<Maps>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Maps> {
        self.inner.read().expect("catalog lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Maps> {
        self.inner.write().expect("catalog lock poisoned")
    }

    // ── Users ─────────────────────────────────────────────────

    /// Insert a new user, stamping both timestamps. The username must be
    /// unique across the catalog.
    pub fn create_user(&self, mut user: User) -> Result<User, ArmadaError> {
        let mut maps = self.write();
        if maps.users.values().any(|u| u.username == user.username) {
            return Err(ArmadaError::AlreadyExists(format!(
                "username {}",
                user.username
            )));
        }
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;
        maps.users.insert(user.id.clone(), user.clone());
        debug!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<User, ArmadaError> {
        self.read()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| ArmadaError::NotFound(format!("user {id}")))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User, ArmadaError> {
        self.read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| ArmadaError::NotFound(format!("user {username}")))
    }

    pub fn list_users(&self) -> Vec<User> {
        self.read().users.values().cloned().collect()
    }

    /// Apply `mutate` to a clone of the user; swap it in and bump
    /// `updated_at` only when the mutator succeeds.
    pub fn update_user<F>(&self, id: &str, mutate: F) -> Result<User, ArmadaError>
    where
        F: FnOnce(&mut User) -> Result<(), ArmadaError>,
    {
        let mut maps = self.write();
        let mut user = maps
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| ArmadaError::NotFound(format!("user {id}")))?;
        mutate(&mut user)?;
        user.updated_at = Utc::now();
        maps.users.insert(id.to_string(), user.clone());
        Ok(user)
    }

    pub fn delete_user(&self, id: &str) -> Result<(), ArmadaError> {
        self.write()
            .users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ArmadaError::NotFound(format!("user {id}")))
    }

    // ── Pools ─────────────────────────────────────────────────

    /// Insert a new pool. Name and subdomain must both be unique, and
    /// every Out must carry a positive weight.
    pub fn create_pool(&self, pool: Pool) -> Result<Pool, ArmadaError> {
        let mut maps = self.write();
        if maps.pools.contains_key(&pool.name) {
            return Err(ArmadaError::AlreadyExists(format!("pool {}", pool.name)));
        }
        if maps.pools.values().any(|p| p.subdomain == pool.subdomain) {
            return Err(ArmadaError::AlreadyExists(format!(
                "subdomain {}",
                pool.subdomain
            )));
        }
        if pool.outs.iter().any(|o| o.weight == 0) {
            return Err(ArmadaError::BadRequest(
                "out weight must be positive".into(),
            ));
        }
        maps.pools.insert(pool.name.clone(), pool.clone());
        debug!(pool = %pool.name, outs = pool.outs.len(), "Pool created");
        Ok(pool)
    }

    pub fn get_pool(&self, name: &str) -> Result<Pool, ArmadaError> {
        self.read()
            .pools
            .get(name)
            .cloned()
            .ok_or_else(|| ArmadaError::NotFound(format!("pool {name}")))
    }

    pub fn list_pools(&self) -> Vec<Pool> {
        self.read().pools.values().cloned().collect()
    }

    /// The full pool map, as served to syncing workers.
    pub fn all_pools(&self) -> HashMap<String, Pool> {
        self.read().pools.clone()
    }

    /// Copy-on-write pool update. A mutated subdomain may not collide
    /// with another pool's.
    pub fn update_pool<F>(&self, name: &str, mutate: F) -> Result<Pool, ArmadaError>
    where
        F: FnOnce(&mut Pool) -> Result<(), ArmadaError>,
    {
        let mut maps = self.write();
        let mut pool = maps
            .pools
            .get(name)
            .cloned()
            .ok_or_else(|| ArmadaError::NotFound(format!("pool {name}")))?;
        mutate(&mut pool)?;
        if maps
            .pools
            .values()
            .any(|p| p.name != pool.name && p.subdomain == pool.subdomain)
        {
            return Err(ArmadaError::AlreadyExists(format!(
                "subdomain {}",
                pool.subdomain
            )));
        }
        maps.pools.insert(name.to_string(), pool.clone());
        Ok(pool)
    }

    pub fn delete_pool(&self, name: &str) -> Result<(), ArmadaError> {
        self.write()
            .pools
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ArmadaError::NotFound(format!("pool {name}")))
    }

    // ── Workers / Regions / Countries (informational) ─────────

    pub fn create_worker(&self, worker: WorkerNode) -> Result<WorkerNode, ArmadaError> {
        create_entry(&mut self.write().workers, worker.name.clone(), worker, "worker")
    }

    pub fn list_workers(&self) -> Vec<WorkerNode> {
        self.read().workers.values().cloned().collect()
    }

    pub fn delete_worker(&self, name: &str) -> Result<(), ArmadaError> {
        delete_entry(&mut self.write().workers, name, "worker")
    }

    pub fn create_region(&self, region: Region) -> Result<Region, ArmadaError> {
        create_entry(&mut self.write().regions, region.name.clone(), region, "region")
    }

    pub fn list_regions(&self) -> Vec<Region> {
        self.read().regions.values().cloned().collect()
    }

    pub fn delete_region(&self, name: &str) -> Result<(), ArmadaError> {
        delete_entry(&mut self.write().regions, name, "region")
    }

    pub fn create_country(&self, country: Country) -> Result<Country, ArmadaError> {
        create_entry(&mut self.write().countries, country.code.clone(), country, "country")
    }

    pub fn list_countries(&self) -> Vec<Country> {
        self.read().countries.values().cloned().collect()
    }

    pub fn delete_country(&self, code: &str) -> Result<(), ArmadaError> {
        delete_entry(&mut self.write().countries, code, "country")
    }
}

fn create_entry<T: Clone>(
    map: &mut HashMap<String, T>,
    key: String,
    value: T,
    kind: &str,
) -> Result<T, ArmadaError> {
    if map.contains_key(&key) {
        return Err(ArmadaError::AlreadyExists(format!("{kind} {key}")));
    }
    map.insert(key, value.clone());
    Ok(value)
}

fn delete_entry<T>(
    map: &mut HashMap<String, T>,
    key: &str,
    kind: &str,
) -> Result<(), ArmadaError> {
    map.remove(key)
        .map(|_| ())
        .ok_or_else(|| ArmadaError::NotFound(format!("{kind} {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_core::pool::Out;
    use armada_core::user::UserStatus;

    fn make_user(id: &str, username: &str) -> User {
        User {
            id: id.into(),
            username: username.into(),
            password_hash: "hash".into(),
            data_limit: 1000,
            data_used: 0,
            allowed_pools: vec!["eu1".into()],
            ip_whitelist: vec![],
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_pool(name: &str, subdomain: &str) -> Pool {
        Pool {
            name: name.into(),
            region: "eu".into(),
            subdomain: subdomain.into(),
            port_start: 6000,
            port_end: 6000,
            outs: vec![Out {
                format: "u:p-%s".into(),
                upstream_port: 6502,
                domain: format!("{subdomain}.proxiess.com"),
                weight: 100,
            }],
        }
    }

    // ── Users ────────────────────────────────────────────────────

    #[test]
    fn create_and_get_user_round_trip() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        let got = catalog.get_user("u1").unwrap();
        assert_eq!(got.username, "alice");
        assert_eq!(got.data_limit, 1000);
    }

    #[test]
    fn duplicate_username_rejected_and_store_unchanged() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        let err = catalog.create_user(make_user("u2", "alice")).unwrap_err();
        assert!(matches!(err, ArmadaError::AlreadyExists(_)));
        assert_eq!(catalog.list_users().len(), 1);
        assert!(catalog.get_user("u2").is_err());
    }

    #[test]
    fn get_user_by_username() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        assert_eq!(catalog.get_user_by_username("alice").unwrap().id, "u1");
        assert!(catalog.get_user_by_username("bob").is_err());
    }

    #[test]
    fn update_user_applies_mutation_and_bumps_updated_at() {
        let catalog = Catalog::new();
        let created = catalog.create_user(make_user("u1", "alice")).unwrap();
        let updated = catalog
            .update_user("u1", |u| {
                u.data_limit = 5000;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.data_limit, 5000);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(catalog.get_user("u1").unwrap().data_limit, 5000);
    }

    #[test]
    fn failed_mutator_leaves_entity_untouched() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        let before = catalog.get_user("u1").unwrap();

        let err = catalog.update_user("u1", |u| {
            u.data_limit = 999_999; // visible only inside the clone
            Err(ArmadaError::BadRequest("rejected".into()))
        });
        assert!(err.is_err());

        let after = catalog.get_user("u1").unwrap();
        assert_eq!(after.data_limit, before.data_limit);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let catalog = Catalog::new();
        let err = catalog.update_user("ghost", |_| Ok(())).unwrap_err();
        assert!(matches!(err, ArmadaError::NotFound(_)));
    }

    #[test]
    fn usage_accumulation_is_monotonic() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        for delta in [100i64, 250, 7] {
            catalog
                .update_user("u1", |u| {
                    u.data_used += delta;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(catalog.get_user("u1").unwrap().data_used, 357);
    }

    #[test]
    fn delete_user_then_not_found() {
        let catalog = Catalog::new();
        catalog.create_user(make_user("u1", "alice")).unwrap();
        catalog.delete_user("u1").unwrap();
        assert!(catalog.get_user("u1").is_err());
        assert!(matches!(
            catalog.delete_user("u1").unwrap_err(),
            ArmadaError::NotFound(_)
        ));
    }

    // ── Pools ────────────────────────────────────────────────────

    #[test]
    fn create_pool_then_get_returns_same_pool() {
        let catalog = Catalog::new();
        let pool = make_pool("eu1", "eu1.x");
        catalog.create_pool(pool.clone()).unwrap();
        let got = catalog.get_pool("eu1").unwrap();
        assert_eq!(got.subdomain, pool.subdomain);
        assert_eq!(got.outs.len(), 1);
    }

    #[test]
    fn duplicate_pool_name_rejected() {
        let catalog = Catalog::new();
        catalog.create_pool(make_pool("eu1", "eu1.x")).unwrap();
        let err = catalog.create_pool(make_pool("eu1", "other.x")).unwrap_err();
        assert!(matches!(err, ArmadaError::AlreadyExists(_)));
    }

    #[test]
    fn duplicate_subdomain_rejected() {
        let catalog = Catalog::new();
        catalog.create_pool(make_pool("eu1", "shared.x")).unwrap();
        let err = catalog.create_pool(make_pool("eu2", "shared.x")).unwrap_err();
        assert!(matches!(err, ArmadaError::AlreadyExists(_)));
        assert_eq!(catalog.list_pools().len(), 1);
    }

    #[test]
    fn zero_weight_out_rejected() {
        let catalog = Catalog::new();
        let mut pool = make_pool("eu1", "eu1.x");
        pool.outs[0].weight = 0;
        let err = catalog.create_pool(pool).unwrap_err();
        assert!(matches!(err, ArmadaError::BadRequest(_)));
    }

    #[test]
    fn update_pool_subdomain_collision_rejected() {
        let catalog = Catalog::new();
        catalog.create_pool(make_pool("eu1", "eu1.x")).unwrap();
        catalog.create_pool(make_pool("eu2", "eu2.x")).unwrap();
        let err = catalog
            .update_pool("eu2", |p| {
                p.subdomain = "eu1.x".into();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ArmadaError::AlreadyExists(_)));
        assert_eq!(catalog.get_pool("eu2").unwrap().subdomain, "eu2.x");
    }

    #[test]
    fn all_pools_returns_full_map() {
        let catalog = Catalog::new();
        catalog.create_pool(make_pool("eu1", "eu1.x")).unwrap();
        catalog.create_pool(make_pool("asia1", "asia1.x")).unwrap();
        let map = catalog.all_pools();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("eu1"));
        assert!(map.contains_key("asia1"));
    }

    #[test]
    fn delete_pool_not_found() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.delete_pool("ghost").unwrap_err(),
            ArmadaError::NotFound(_)
        ));
    }

    // ── Informational entities ───────────────────────────────────

    #[test]
    fn country_create_list_delete() {
        let catalog = Catalog::new();
        catalog
            .create_country(Country {
                code: "JP".into(),
                name: "japan".into(),
            })
            .unwrap();
        assert!(matches!(
            catalog
                .create_country(Country {
                    code: "JP".into(),
                    name: "japan again".into(),
                })
                .unwrap_err(),
            ArmadaError::AlreadyExists(_)
        ));
        assert_eq!(catalog.list_countries().len(), 1);
        catalog.delete_country("JP").unwrap();
        assert!(catalog.list_countries().is_empty());
    }

    #[test]
    fn worker_and_region_storage() {
        let catalog = Catalog::new();
        catalog
            .create_worker(WorkerNode {
                name: "asia".into(),
                subdomains: vec!["netnutasia.x".into()],
            })
            .unwrap();
        catalog
            .create_region(Region {
                name: "asia".into(),
                countries: vec!["JP".into()],
                pools: vec!["netnutasia".into()],
            })
            .unwrap();
        assert_eq!(catalog.list_workers().len(), 1);
        assert_eq!(catalog.list_regions()[0].pools[0], "netnutasia");
        catalog.delete_worker("asia").unwrap();
        catalog.delete_region("asia").unwrap();
    }
}
