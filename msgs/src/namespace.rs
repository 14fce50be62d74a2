use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{create_mode::CreateMode, error_code::ServiceError, watch::{WatchKind, WatchedEvent}};

pub type SessionId = u32;

/// Watches that fired during an operation, addressed to the session that armed them.
pub type Fired = Vec<(SessionId, WatchedEvent)>;

#[derive(Debug, Default)]
struct Node {
    data: Vec<u8>,
    ephemeral_owner: Option<SessionId>,
    children: BTreeSet<String>,
}

/// Hierarchical node tree with one-shot data and child watches per session.
#[derive(Debug)]
pub struct Namespace {
    nodes: HashMap<String, Node>,
    watches: HashMap<(WatchKind, String), HashSet<SessionId>>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Namespace {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::default());
        Namespace {
            nodes,
            watches: HashMap::new(),
        }
    }

    pub fn exists(&mut self, session: SessionId, path: &str, watch: bool) -> Result<bool, ServiceError> {
        validate_path(path)?;
        if watch {
            self.arm(session, WatchKind::Data, path);
        }
        Ok(self.nodes.contains_key(path))
    }

    pub fn get_data(&mut self, session: SessionId, path: &str, watch: bool) -> Result<Vec<u8>, ServiceError> {
        validate_path(path)?;
        let data = self.nodes.get(path).ok_or(ServiceError::NoNode)?.data.clone();
        if watch {
            self.arm(session, WatchKind::Data, path);
        }
        Ok(data)
    }

    pub fn get_children(&mut self, session: SessionId, path: &str, watch: bool) -> Result<Vec<String>, ServiceError> {
        validate_path(path)?;
        let children = self.nodes.get(path).ok_or(ServiceError::NoNode)?.children.iter().cloned().collect();
        if watch {
            self.arm(session, WatchKind::Children, path);
        }
        Ok(children)
    }

    pub fn create(&mut self, session: SessionId, path: &str, mode: CreateMode, data: Option<&[u8]>) -> Result<(String, Fired), ServiceError> {
        validate_path(path)?;
        let (parent_path, name) = split_parent(path).ok_or(ServiceError::BadArguments)?;
        if self.nodes.contains_key(path) {
            return Err(ServiceError::NodeExists);
        }
        let parent = self.nodes.get_mut(parent_path).ok_or(ServiceError::NoNode)?;
        if parent.ephemeral_owner.is_some() {
            return Err(ServiceError::NoChildrenForEphemerals);
        }
        parent.children.insert(name.to_string());

        let ephemeral_owner = match mode {
            CreateMode::Persistent => None,
            CreateMode::Ephemeral => Some(session),
        };
        self.nodes.insert(path.to_string(), Node {
            data: data.map(<[u8]>::to_vec).unwrap_or_default(),
            ephemeral_owner,
            children: BTreeSet::new(),
        });

        let mut fired = self.trigger(WatchKind::Data, path);
        fired.extend(self.trigger(WatchKind::Children, parent_path));
        Ok((path.to_string(), fired))
    }

    pub fn set_data(&mut self, path: &str, data: &[u8]) -> Result<Fired, ServiceError> {
        validate_path(path)?;
        let node = self.nodes.get_mut(path).ok_or(ServiceError::NoNode)?;
        node.data = data.to_vec();
        Ok(self.trigger(WatchKind::Data, path))
    }

    /// Drops the session's watches and ephemeral nodes. Watches fired by the removals
    /// are returned for the remaining sessions.
    pub fn close_session(&mut self, session: SessionId) -> Fired {
        for watchers in self.watches.values_mut() {
            watchers.remove(&session);
        }
        self.watches.retain(|_, watchers| !watchers.is_empty());

        let owned: Vec<String> = self.nodes.iter()
            .filter(|(_, node)| node.ephemeral_owner == Some(session))
            .map(|(path, _)| path.clone())
            .collect();

        owned.iter().flat_map(|path| self.remove(path)).collect()
    }

    /// Removes a childless node. A node with children is refused with `BadArguments`.
    pub fn delete(&mut self, path: &str) -> Result<Fired, ServiceError> {
        validate_path(path)?;
        let node = self.nodes.get(path).ok_or(ServiceError::NoNode)?;
        if path == "/" || !node.children.is_empty() {
            return Err(ServiceError::BadArguments);
        }
        Ok(self.remove(path))
    }

    fn remove(&mut self, path: &str) -> Fired {
        self.nodes.remove(path);
        let Some((parent_path, name)) = split_parent(path) else { return Vec::new() };
        if let Some(parent) = self.nodes.get_mut(parent_path) {
            parent.children.remove(name);
        }
        let mut fired = self.trigger(WatchKind::Data, path);
        fired.extend(self.trigger(WatchKind::Children, path));
        fired.extend(self.trigger(WatchKind::Children, parent_path));
        fired
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn arm(&mut self, session: SessionId, kind: WatchKind, path: &str) {
        self.watches.entry((kind, path.to_string())).or_default().insert(session);
    }

    fn trigger(&mut self, kind: WatchKind, path: &str) -> Fired {
        let Some(watchers) = self.watches.remove(&(kind, path.to_string())) else { return Vec::new() };
        watchers.into_iter()
            .map(|session| (session, WatchedEvent { kind, path: path.to_string() }))
            .collect()
    }
}

pub fn validate_path(path: &str) -> Result<(), ServiceError> {
    if !path.starts_with('/') {
        return Err(ServiceError::BadArguments);
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') || path.contains("//") {
        return Err(ServiceError::BadArguments);
    }
    Ok(())
}

fn split_parent(path: &str) -> Option<(&str, &str)> {
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    Some((if parent.is_empty() { "/" } else { parent }, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_parent_and_rejects_duplicates() {
        let mut ns = Namespace::new();
        assert_eq!(ns.create(1, "/a/b", CreateMode::Persistent, None), Err(ServiceError::NoNode));
        ns.create(1, "/a", CreateMode::Persistent, None).unwrap();
        ns.create(1, "/a/b", CreateMode::Persistent, Some(b"x")).unwrap();
        assert_eq!(ns.create(2, "/a/b", CreateMode::Persistent, None).unwrap_err(), ServiceError::NodeExists);
        assert_eq!(ns.get_children(1, "/a", false).unwrap(), vec!["b".to_string()]);
        assert_eq!(ns.get_data(1, "/a/b", false).unwrap(), b"x".to_vec());
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let mut ns = Namespace::new();
        assert_eq!(ns.exists(1, "a", false), Err(ServiceError::BadArguments));
        assert_eq!(ns.exists(1, "/a/", false), Err(ServiceError::BadArguments));
        assert_eq!(ns.exists(1, "/a//b", false), Err(ServiceError::BadArguments));
        assert_eq!(ns.exists(1, "/", false), Ok(true));
    }

    #[test]
    fn watches_fire_once_for_the_arming_session() {
        let mut ns = Namespace::new();
        ns.create(1, "/a", CreateMode::Persistent, None).unwrap();
        ns.get_children(7, "/a", true).unwrap();

        let (_, fired) = ns.create(1, "/a/x", CreateMode::Persistent, None).unwrap();
        assert_eq!(fired, vec![(7, WatchedEvent { kind: WatchKind::Children, path: "/a".into() })]);

        let (_, fired) = ns.create(1, "/a/y", CreateMode::Persistent, None).unwrap();
        assert!(fired.is_empty());
    }

    #[test]
    fn data_watch_armed_by_exists_fires_on_create() {
        let mut ns = Namespace::new();
        assert!(!ns.exists(4, "/n", true).unwrap());
        let (_, fired) = ns.create(1, "/n", CreateMode::Persistent, None).unwrap();
        assert_eq!(fired, vec![(4, WatchedEvent { kind: WatchKind::Data, path: "/n".into() })]);
    }

    #[test]
    fn get_data_on_missing_node_arms_nothing() {
        let mut ns = Namespace::new();
        assert_eq!(ns.get_data(4, "/n", true), Err(ServiceError::NoNode));
        let (_, fired) = ns.create(1, "/n", CreateMode::Persistent, None).unwrap();
        assert!(fired.is_empty());
    }

    #[test]
    fn closing_a_session_removes_its_ephemerals() {
        let mut ns = Namespace::new();
        ns.create(1, "/a", CreateMode::Persistent, None).unwrap();
        ns.create(2, "/a/e", CreateMode::Ephemeral, Some(b"1")).unwrap();
        assert_eq!(ns.create(2, "/a/e/child", CreateMode::Persistent, None), Err(ServiceError::NoChildrenForEphemerals));
        ns.get_children(3, "/a", true).unwrap();
        ns.get_data(2, "/a/e", true).unwrap();

        let fired = ns.close_session(2);
        assert_eq!(fired, vec![(3, WatchedEvent { kind: WatchKind::Children, path: "/a".into() })]);
        assert!(!ns.exists(1, "/a/e", false).unwrap());
        assert!(ns.get_children(1, "/a", false).unwrap().is_empty());
    }

    #[test]
    fn delete_fires_data_and_parent_watches() {
        let mut ns = Namespace::new();
        ns.create(1, "/a", CreateMode::Persistent, None).unwrap();
        ns.create(1, "/a/p", CreateMode::Persistent, Some(b"1")).unwrap();
        assert_eq!(ns.delete("/a"), Err(ServiceError::BadArguments));
        ns.get_children(3, "/a", true).unwrap();
        ns.get_data(4, "/a/p", true).unwrap();

        let fired = ns.delete("/a/p").unwrap();
        assert_eq!(fired.len(), 2);
        assert!(fired.contains(&(4, WatchedEvent { kind: WatchKind::Data, path: "/a/p".into() })));
        assert!(fired.contains(&(3, WatchedEvent { kind: WatchKind::Children, path: "/a".into() })));
        assert_eq!(ns.delete("/a/p"), Err(ServiceError::NoNode));
        assert!(ns.get_children(1, "/a", false).unwrap().is_empty());
    }
}
