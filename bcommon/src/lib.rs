//! Shared primitives for the banter chat orchestration workspace.
//!
//! ```rust
//! use bcommon::{Registry, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let mut registry = Registry::new();
//! registry.insert(session.to_string(), 42_u32);
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(registry.get("session-1"), Some(&42));
//! ```

pub mod future {
    //! Boxed-future alias used at async trait seams.
    //!
    //! ```rust
    //! use bcommon::BoxFuture;
    //!
    //! fn doubled<'a>(value: &'a u32) -> BoxFuture<'a, u32> {
    //!     Box::pin(async move { value * 2 })
    //! }
    //!
    //! let _future = doubled(&21);
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod session {
    //! Caller-supplied session identifier newtype.

    use std::fmt::{Display, Formatter};

    /// Identifies one long-lived conversational context. Supplied by the
    /// caller and unique within a single store.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod registry {
    //! Keyed map wrapper backing the runtime registries and session table.
    //!
    //! ```rust
    //! use bcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("echo".to_string(), 1_u32);
    //!
    //! assert!(registry.contains_key("echo"));
    //! assert_eq!(registry.remove("echo"), Some(1));
    //! assert!(registry.is_empty());
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        entries: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                entries: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        /// Inserts a value, returning the superseded entry if the key was
        /// already registered.
        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.entries.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.entries.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.entries.remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.entries.contains_key(key)
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.entries.values()
        }

        pub fn len(&self) -> usize {
            self.entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }
}

pub use future::BoxFuture;
pub use registry::Registry;
pub use session::SessionId;
