//! Long-lived store handle
//!
//! `Store` owns an engine and a current location. Every address argument is
//! resolved against the current location through the path navigator. Closing
//! the handle moves it to `Closed`; from then on every call fails with
//! `HandleClosed` without reaching the engine.
//!
//! The handle takes no locks. Sharing one across threads needs external
//! synchronisation, and two handles over the same engine state see each
//! other's writes only through the engine.

use crate::config::Config;
use crate::observability::{Event, Logger};
use crate::path::{self, ROOT};
use crate::storage::StorageEngine;
use crate::tree::{self, AttrPolicy, NodeInfo, TreeError, TreeResult, WriteOptions, WriteReport};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Open { current: String },
    Closed,
}

/// Stateful handle over a storage engine
#[derive(Debug)]
pub struct Store<E: StorageEngine> {
    engine: E,
    state: State,
    options: WriteOptions,
    attrs: AttrPolicy,
}

impl<E: StorageEngine> Store<E> {
    /// Open a handle at `/` with defaults taken from `config`.
    pub fn open(engine: E, config: &Config) -> TreeResult<Self> {
        config
            .validate()
            .map_err(|e| TreeError::InvalidOption(e.to_string()))?;
        let attrs = config
            .attr_policy()
            .map_err(|e| TreeError::InvalidOption(e.to_string()))?;
        Logger::emit(Event::StoreOpened, &[("location", ROOT)]);
        Ok(Self {
            engine,
            state: State::Open {
                current: ROOT.to_string(),
            },
            options: config.write_options(),
            attrs,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    pub fn current_location(&self) -> TreeResult<&str> {
        match &self.state {
            State::Open { current } => Ok(current.as_str()),
            State::Closed => Err(TreeError::HandleClosed),
        }
    }

    /// Absolute address of `input` relative to the current location.
    pub fn resolve(&self, input: &str) -> TreeResult<String> {
        Ok(path::resolve_path(self.current_location()?, input))
    }

    /// Move the current location. The target must be an existing container.
    pub fn change_location(&mut self, input: &str) -> TreeResult<&str> {
        let target = path::change_location(self.current_location()?, input);
        let is_container = self
            .engine
            .container_exists(&target)
            .map_err(TreeError::from_engine)?;
        if !is_container {
            return Err(TreeError::NotAContainer { path: target });
        }
        self.state = State::Open { current: target };
        self.current_location()
    }

    /// Write with the handle's default options.
    pub fn write(&mut self, value: &Value, destination: &str) -> TreeResult<WriteReport> {
        let options = self.options.clone();
        self.write_with(value, destination, &options)
    }

    pub fn write_with(
        &mut self,
        value: &Value,
        destination: &str,
        options: &WriteOptions,
    ) -> TreeResult<WriteReport> {
        let destination = self.resolve(destination)?;
        tree::write(&mut self.engine, value, &destination, options)
    }

    /// Read with the handle's default attribute policy.
    pub fn read(&self, source: &str) -> TreeResult<Value> {
        self.read_with(source, &self.attrs)
    }

    pub fn read_with(&self, source: &str, policy: &AttrPolicy) -> TreeResult<Value> {
        let source = self.resolve(source)?;
        tree::read(&self.engine, &source, policy)
    }

    pub fn write_attr(&mut self, owner: &str, name: &str, value: &Value) -> TreeResult<WriteReport> {
        let owner = self.resolve(owner)?;
        tree::write_attribute(&mut self.engine, &owner, name, value, &self.options)
    }

    pub fn read_attr(&self, owner: &str, name: &str) -> TreeResult<Value> {
        let owner = self.resolve(owner)?;
        tree::read_attribute(&self.engine, &owner, name)
    }

    pub fn ls(&self, address: &str, recursive: bool, full_names: bool) -> TreeResult<Vec<String>> {
        let address = self.resolve(address)?;
        tree::ls(&self.engine, &address, recursive, full_names)
    }

    pub fn exists(&self, address: &str) -> TreeResult<bool> {
        let address = self.resolve(address)?;
        tree::exists(&self.engine, &address)
    }

    pub fn attr_names(&self, address: &str) -> TreeResult<Vec<String>> {
        let address = self.resolve(address)?;
        tree::attr_names(&self.engine, &address)
    }

    pub fn info(&self, address: &str) -> TreeResult<NodeInfo> {
        let address = self.resolve(address)?;
        tree::info(&self.engine, &address)
    }

    /// Printable tree below `address`
    pub fn str(&self, address: &str, show_attrs: bool) -> TreeResult<String> {
        let address = self.resolve(address)?;
        tree::render(&self.engine, &address, show_attrs)
    }

    pub fn delete(&mut self, address: &str) -> TreeResult<()> {
        let address = self.resolve(address)?;
        tree::delete(&mut self.engine, &address)
    }

    pub fn delete_attr(&mut self, address: &str, name: &str) -> TreeResult<()> {
        let address = self.resolve(address)?;
        tree::delete_attr(&mut self.engine, &address, name)
    }

    pub fn rename(&mut self, from: &str, to: &str) -> TreeResult<()> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        tree::rename(&mut self.engine, &from, &to)
    }

    /// Invalidate the handle. Closing twice is `HandleClosed`.
    pub fn close(&mut self) -> TreeResult<()> {
        let current = self.current_location()?.to_string();
        self.state = State::Closed;
        Logger::emit(Event::StoreClosed, &[("location", current.as_str())]);
        Ok(())
    }

    /// Give back the engine, open or closed.
    pub fn into_engine(self) -> E {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryEngine;
    use crate::value::Container;

    fn open() -> Store<MemoryEngine> {
        let mut store = Store::open(MemoryEngine::new(), &Config::default()).unwrap();
        let inner = Container::new().with("b", Value::int(vec![1]));
        let tree = Value::container(Container::new().with("a", Value::container(inner)));
        store.write(&tree, "/data").unwrap();
        store
    }

    #[test]
    fn test_relative_addresses_follow_location() {
        let mut store = open();
        assert_eq!(store.change_location("data/a").unwrap(), "/data/a");
        assert_eq!(store.read("b").unwrap(), Value::int(vec![1]));
        store.write(&Value::float(vec![0.5]), "../c").unwrap();
        assert!(store.exists("/data/c").unwrap());
        assert_eq!(store.change_location("..").unwrap(), "/data");
    }

    #[test]
    fn test_change_location_needs_container() {
        let mut store = open();
        assert_eq!(
            store.change_location("/data/a/b").unwrap_err(),
            TreeError::NotAContainer {
                path: "/data/a/b".into()
            }
        );
        assert!(store.change_location("/missing").is_err());
        assert_eq!(store.current_location().unwrap(), "/");
    }

    #[test]
    fn test_closed_handle_rejects_everything() {
        let mut store = open();
        store.close().unwrap();
        assert!(!store.is_open());
        assert_eq!(store.current_location(), Err(TreeError::HandleClosed));
        assert_eq!(store.read("/data"), Err(TreeError::HandleClosed));
        assert_eq!(
            store.write(&Value::null(), "/x"),
            Err(TreeError::HandleClosed)
        );
        assert_eq!(store.ls("/", false, false), Err(TreeError::HandleClosed));
        assert_eq!(store.close(), Err(TreeError::HandleClosed));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = Config {
            compression_level: 12,
            ..Config::default()
        };
        assert!(matches!(
            Store::open(MemoryEngine::new(), &config),
            Err(TreeError::InvalidOption(_))
        ));
    }
}
