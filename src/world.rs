//! The interning context
//!
//! A [`World`] hands out canonical [`Node`]s: URIs and blank node
//! identifiers interned by (kind, lexical form), literals interned by
//! (lexical form, datatype reference, language reference), and language
//! tags interned so tag comparison is pointer comparison. Everything
//! downstream reduces node equality to reference identity.
//!
//! Interner maps use the raw-entry API keyed by precomputed hashes so a
//! cache hit allocates nothing. Each map key's `Hash` implementation
//! produces exactly the hash the lookups use, which keeps the maps
//! coherent across rehashes.
//!
//! Soft contract violations are routed through an installable error
//! sink; the default logs a warning.

use crate::error::StoreError;
use crate::node::{Lang, LiteralTag, Node, NodeKind};
use hashbrown::hash_map::RawEntryMut;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

/// Callback invoked for soft errors
pub type ErrorSink = Box<dyn Fn(&StoreError) + Send + Sync>;

/// Key for the URI/blank interner: hashes and compares by (kind, text)
struct NameKey(Node);

impl PartialEq for NameKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind() && self.0.as_str() == other.0.as_str()
    }
}

impl Eq for NameKey {}

impl Hash for NameKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.kind() as u8).hash(state);
        self.0.as_str().hash(state);
    }
}

/// Key for the literal interner: hashes and compares by
/// (text, datatype reference, language reference)
struct LiteralKey(Node);

fn tag_addrs(node: &Node) -> (usize, usize) {
    match node.literal_tag() {
        Some(LiteralTag::Datatype(dt)) => (dt.addr(), 0),
        Some(LiteralTag::Language(lang)) => (0, lang.addr()),
        _ => (0, 0),
    }
}

impl PartialEq for LiteralKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str() && tag_addrs(&self.0) == tag_addrs(&other.0)
    }
}

impl Eq for LiteralKey {}

impl Hash for LiteralKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (dt_addr, lang_addr) = tag_addrs(&self.0);
        self.0.as_str().hash(state);
        dt_addr.hash(state);
        lang_addr.hash(state);
    }
}

fn name_hash<S: BuildHasher>(builder: &S, kind: NodeKind, text: &str) -> u64 {
    let mut hasher = builder.build_hasher();
    (kind as u8).hash(&mut hasher);
    text.hash(&mut hasher);
    hasher.finish()
}

fn literal_hash<S: BuildHasher>(builder: &S, text: &str, dt_addr: usize, lang_addr: usize) -> u64 {
    let mut hasher = builder.build_hasher();
    text.hash(&mut hasher);
    dt_addr.hash(&mut hasher);
    lang_addr.hash(&mut hasher);
    hasher.finish()
}

fn str_hash<S: BuildHasher>(builder: &S, text: &str) -> u64 {
    let mut hasher = builder.build_hasher();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Process-wide interning context
///
/// A single world may back multiple models; nodes are shareable across
/// them. Callers serialize access the same way they serialize model
/// access (the locks here only make interior mutability safe, they are
/// not a concurrency design).
pub struct World {
    names: RwLock<HashMap<NameKey, ()>>,
    literals: RwLock<HashMap<LiteralKey, ()>>,
    langs: RwLock<HashMap<Arc<str>, ()>>,
    sink: RwLock<Option<ErrorSink>>,
}

impl World {
    /// Create a new world with empty interners
    pub fn new() -> Self {
        World {
            names: RwLock::new(HashMap::new()),
            literals: RwLock::new(HashMap::new()),
            langs: RwLock::new(HashMap::new()),
            sink: RwLock::new(None),
        }
    }

    /// Install the callback for soft errors
    ///
    /// Without a sink, soft errors are logged as warnings.
    pub fn set_error_sink(&self, sink: impl Fn(&StoreError) + Send + Sync + 'static) {
        *self.sink.write() = Some(Box::new(sink));
    }

    /// Restore the default error handling
    pub fn clear_error_sink(&self) {
        *self.sink.write() = None;
    }

    pub(crate) fn report(&self, error: &StoreError) {
        match &*self.sink.read() {
            Some(sink) => sink(error),
            None => tracing::warn!("{}", error),
        }
    }

    /// Number of interned nodes
    pub fn num_nodes(&self) -> usize {
        self.names.read().len() + self.literals.read().len()
    }

    /// The canonical URI node for `text`
    pub fn new_uri(&self, text: &str) -> Node {
        self.intern_name(NodeKind::Uri, text, || Node::uri(text))
    }

    /// The canonical blank node for the identifier `text`
    pub fn new_blank(&self, text: &str) -> Node {
        self.intern_name(NodeKind::Blank, text, || Node::blank(text))
    }

    fn intern_name(&self, kind: NodeKind, text: &str, make: impl FnOnce() -> Node) -> Node {
        let mut names = self.names.write();
        let hash = name_hash(names.hasher(), kind, text);

        let entry = names
            .raw_entry_mut()
            .from_hash(hash, |k| k.0.kind() == kind && k.0.as_str() == text);

        match entry {
            RawEntryMut::Occupied(e) => e.key().0.clone(),
            RawEntryMut::Vacant(e) => {
                let node = make();
                e.insert_hashed_nocheck(hash, NameKey(node.clone()), ());
                node
            }
        }
    }

    /// The canonical literal node for (text, datatype, language)
    ///
    /// At most one of `datatype` and `language` may be given; when both
    /// are, the language wins, the datatype is ignored, and the
    /// conflict is reported through the error sink. A datatype that is
    /// not a URI node is likewise reported and ignored.
    pub fn new_literal(
        &self,
        datatype: Option<&Node>,
        text: &str,
        language: Option<&str>,
    ) -> Node {
        let mut datatype = datatype;
        if datatype.is_some() && language.is_some() {
            self.report(&StoreError::conflicting_literal_tag(text));
            datatype = None;
        }
        if let Some(dt) = datatype {
            if !dt.is_uri() {
                self.report(&StoreError::non_uri_datatype(dt.to_string()));
                datatype = None;
            }
        }

        let lang = language.map(|tag| self.intern_lang(tag));
        let dt_addr = datatype.map_or(0, Node::addr);
        let lang_addr = lang.as_ref().map_or(0, Lang::addr);

        let mut literals = self.literals.write();
        let hash = literal_hash(literals.hasher(), text, dt_addr, lang_addr);

        let entry = literals.raw_entry_mut().from_hash(hash, |k| {
            k.0.as_str() == text && tag_addrs(&k.0) == (dt_addr, lang_addr)
        });

        match entry {
            RawEntryMut::Occupied(e) => e.key().0.clone(),
            RawEntryMut::Vacant(e) => {
                let tag = match (datatype, lang) {
                    (_, Some(l)) => LiteralTag::Language(l),
                    (Some(dt), None) => LiteralTag::Datatype(dt.clone()),
                    (None, None) => LiteralTag::Plain,
                };
                let node = Node::literal(text, tag);
                e.insert_hashed_nocheck(hash, LiteralKey(node.clone()), ());
                node
            }
        }
    }

    /// The canonical interned language tag
    pub fn intern_lang(&self, tag: &str) -> Lang {
        let mut langs = self.langs.write();
        let hash = str_hash(langs.hasher(), tag);

        let entry = langs.raw_entry_mut().from_hash(hash, |k| k.as_ref() == tag);

        match entry {
            RawEntryMut::Occupied(e) => Lang::from_arc(e.key().clone()),
            RawEntryMut::Vacant(e) => {
                let arc: Arc<str> = Arc::from(tag);
                e.insert_hashed_nocheck(hash, arc.clone(), ());
                Lang::from_arc(arc)
            }
        }
    }

    /// Drop a node from its interner once no stored quad references it
    ///
    /// This is the only path by which the interners shrink. A miss
    /// means the bookkeeping went wrong somewhere; it is reported and
    /// the node leaks.
    pub(crate) fn evict(&self, node: &Node) {
        let removed = if node.is_literal() {
            let mut literals = self.literals.write();
            let (dt_addr, lang_addr) = tag_addrs(node);
            let hash = literal_hash(literals.hasher(), node.as_str(), dt_addr, lang_addr);
            match literals
                .raw_entry_mut()
                .from_hash(hash, |k| Node::ptr_eq(&k.0, node))
            {
                RawEntryMut::Occupied(e) => {
                    e.remove();
                    true
                }
                RawEntryMut::Vacant(_) => false,
            }
        } else {
            let mut names = self.names.write();
            let hash = name_hash(names.hasher(), node.kind(), node.as_str());
            match names
                .raw_entry_mut()
                .from_hash(hash, |k| Node::ptr_eq(&k.0, node))
            {
                RawEntryMut::Occupied(e) => {
                    e.remove();
                    true
                }
                RawEntryMut::Vacant(_) => false,
            }
        };

        if !removed {
            self.report(&StoreError::interner_leak(node.to_string()));
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("names", &self.names.read().len())
            .field("literals", &self.literals.read().len())
            .field("langs", &self.langs.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_uri_interning_merges_equivalent() {
        let world = World::new();
        let a = world.new_uri("http://example.org");
        let b = world.new_uri("http://example.org");
        assert!(Node::ptr_eq(&a, &b));
        assert_eq!(world.num_nodes(), 1);
    }

    #[test]
    fn test_interning_keeps_distinct_values_apart() {
        let world = World::new();
        let a = world.new_uri("http://x");
        let b = world.new_uri("http://y");
        assert!(!Node::ptr_eq(&a, &b));

        let blank = world.new_blank("b0");
        let blank2 = world.new_blank("b0");
        assert!(Node::ptr_eq(&blank, &blank2));
        assert!(!Node::ptr_eq(&blank, &world.new_blank("b1")));
    }

    #[test]
    fn test_uri_and_blank_do_not_collide() {
        let world = World::new();
        let uri = world.new_uri("shared");
        let blank = world.new_blank("shared");
        assert!(!Node::ptr_eq(&uri, &blank));
        assert_eq!(world.num_nodes(), 2);
    }

    #[test]
    fn test_literal_interning_key() {
        let world = World::new();
        let dt = world.new_uri("http://x");

        let plain = world.new_literal(None, "hello", None);
        let plain2 = world.new_literal(None, "hello", None);
        assert!(Node::ptr_eq(&plain, &plain2));

        let typed = world.new_literal(Some(&dt), "hello", None);
        let tagged = world.new_literal(None, "hello", Some("en"));
        assert!(!Node::ptr_eq(&plain, &typed));
        assert!(!Node::ptr_eq(&plain, &tagged));
        assert!(!Node::ptr_eq(&typed, &tagged));

        // Same text, different datatype: distinct nodes
        let dt2 = world.new_uri("http://y");
        let typed2 = world.new_literal(Some(&dt2), "hello", None);
        assert!(!Node::ptr_eq(&typed, &typed2));

        assert!(Node::ptr_eq(
            &typed,
            &world.new_literal(Some(&dt), "hello", None)
        ));
    }

    #[test]
    fn test_language_tags_are_interned() {
        let world = World::new();
        let a = world.new_literal(None, "bonjour", Some("fr"));
        let b = world.new_literal(None, "salut", Some("fr"));
        assert!(!Node::ptr_eq(&a, &b));
        // Distinct literals share the interned tag
        assert_eq!(world.intern_lang("fr"), world.intern_lang("fr"));
        assert_eq!(a.language(), Some("fr"));
        assert_eq!(b.language(), Some("fr"));
    }

    #[test]
    fn test_conflicting_tag_reports_and_language_wins() {
        let world = World::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        world.set_error_sink(move |e| log.lock().push(e.to_string()));

        let dt = world.new_uri("http://x");
        let node = world.new_literal(Some(&dt), "both", Some("en"));
        assert_eq!(node.language(), Some("en"));
        assert!(node.datatype().is_none());
        assert_eq!(seen.lock().len(), 1);

        // And the result interns as the language-tagged literal
        let again = world.new_literal(None, "both", Some("en"));
        assert!(Node::ptr_eq(&node, &again));
    }

    #[test]
    fn test_non_uri_datatype_reports_and_is_ignored() {
        let world = World::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        world.set_error_sink(move |e| log.lock().push(e.to_string()));

        let bogus = world.new_blank("dt");
        let node = world.new_literal(Some(&bogus), "x", None);
        assert!(node.datatype().is_none());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_evict_shrinks_interner() {
        let world = World::new();
        let node = world.new_uri("http://x");
        assert_eq!(world.num_nodes(), 1);
        world.evict(&node);
        assert_eq!(world.num_nodes(), 0);

        // Re-interning after eviction produces a fresh canonical node
        let again = world.new_uri("http://x");
        assert!(!Node::ptr_eq(&node, &again));
    }

    #[test]
    fn test_evict_miss_reports_leak() {
        let world = World::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        world.set_error_sink(move |e| log.lock().push(e.to_string()));

        let node = world.new_uri("http://x");
        world.evict(&node);
        world.evict(&node);
        assert_eq!(seen.lock().len(), 1);
        assert!(seen.lock()[0].contains("leak"));
    }

    #[test]
    fn test_interner_survives_growth() {
        let world = World::new();
        let first = world.new_uri("uri-0");
        for i in 0..2000 {
            world.new_uri(&format!("uri-{}", i));
        }
        // The canonical node is still found after many rehashes
        assert!(Node::ptr_eq(&first, &world.new_uri("uri-0")));
        assert_eq!(world.num_nodes(), 2000);
    }
}
