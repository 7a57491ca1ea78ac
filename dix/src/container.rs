//! The registry of bindings, capabilities and nodes.

use crate::core::{SemanticType, TypeKey};
use crate::node::{Lookup, Node, Slot};
use crate::value::{Resolved, Value};
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Cast = Arc<dyn Fn(&Value) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// The single source of truth for everything a [`Dix`](crate::Dix) knows.
///
/// Bindings keep their first registration position when overwritten, so
/// capability scans always run in a stable order. No lock is held while a
/// capability cast runs.
#[derive(Default)]
pub(crate) struct Container {
  bindings: RwLock<IndexMap<TypeKey, Value>>,
  // (interface, concrete) -> cast producing a boxed `Arc<dyn Interface>`.
  capabilities: DashMap<(TypeId, TypeId), Cast>,
  nodes: RwLock<Vec<Arc<Node>>>,
  dirty: AtomicBool,
}

impl Container {
  /// Binds `value` under `key`. Re-binding the instance already bound there
  /// leaves the container clean.
  pub(crate) fn register_value(&self, key: TypeKey, value: Value) {
    let previous = self.bindings.write().insert(key, value.clone());
    if !previous.is_some_and(|previous| previous.same_instance(&value)) {
      self.dirty.store(true, Ordering::SeqCst);
    }
  }

  pub(crate) fn register_node(&self, node: Arc<Node>) {
    self.nodes.write().push(node);
  }

  /// Declares that the concrete type `C` satisfies the interface `I`.
  pub(crate) fn register_capability<I, C>(&self, cast: impl Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static)
  where
    I: ?Sized + Send + Sync + 'static,
    C: Any + Send + Sync,
  {
    let cast: Cast = Arc::new(move |value: &Value| {
      value
        .downcast::<C>()
        .map(|concrete| Arc::new(cast(concrete)) as Arc<dyn Any + Send + Sync>)
    });
    self
      .capabilities
      .insert((TypeId::of::<I>(), TypeId::of::<C>()), cast);
    self.dirty.store(true, Ordering::SeqCst);
  }

  pub(crate) fn lookup(&self, slot: &Slot) -> Option<Resolved> {
    match slot.lookup {
      Lookup::Concrete => self.lookup_concrete(&slot.key),
      Lookup::Capability => self.lookup_capability(slot.key.ty, &slot.key.group),
    }
  }

  pub(crate) fn lookup_concrete(&self, key: &TypeKey) -> Option<Resolved> {
    self
      .bindings
      .read()
      .get(key)
      .cloned()
      .map(Resolved::concrete)
  }

  /// Finds the first binding in `group`, in registration order, whose concrete
  /// type satisfies `interface`.
  pub(crate) fn lookup_capability(&self, interface: SemanticType, group: &str) -> Option<Resolved> {
    let candidates: Vec<Value> = self
      .bindings
      .read()
      .iter()
      .filter(|(key, _)| key.group == group)
      .map(|(_, value)| value.clone())
      .collect();

    candidates.into_iter().find_map(|value| {
      let cast = self
        .capabilities
        .get(&(interface.id(), value.ty().id()))
        .map(|entry| entry.value().clone())?;
      let handle = cast(&value)?;
      Some(Resolved::capability(value, handle))
    })
  }

  pub(crate) fn is_absent(&self, key: &TypeKey) -> bool {
    !self.bindings.read().contains_key(key)
  }

  pub(crate) fn nodes(&self) -> Vec<Arc<Node>> {
    self.nodes.read().clone()
  }

  pub(crate) fn bindings(&self) -> Vec<(TypeKey, Value)> {
    self
      .bindings
      .read()
      .iter()
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect()
  }

  /// Clears the dirty flag, returning whether it was set.
  pub(crate) fn take_dirty(&self) -> bool {
    self.dirty.swap(false, Ordering::SeqCst)
  }

  pub(crate) fn is_dirty(&self) -> bool {
    self.dirty.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::DEFAULT_GROUP;

  trait Hello: Send + Sync {
    fn hello(&self) -> String;
  }

  struct English;
  impl Hello for English {
    fn hello(&self) -> String {
      "hello".into()
    }
  }

  struct German;
  impl Hello for German {
    fn hello(&self) -> String {
      "hallo".into()
    }
  }

  fn hello_slot(group: &str) -> Slot {
    Slot {
      key: TypeKey::new(SemanticType::of::<dyn Hello>(), group),
      lookup: Lookup::Capability,
    }
  }

  #[test]
  fn concrete_lookup_is_exact_on_type_and_group() {
    let container = Container::default();
    container.register_value(TypeKey::of::<English>(Some("en")), Value::new(Arc::new(English)));

    assert!(container.lookup_concrete(&TypeKey::of::<English>(Some("en"))).is_some());
    assert!(container.lookup_concrete(&TypeKey::of::<English>(None)).is_none());
    assert!(container.is_absent(&TypeKey::of::<German>(Some("en"))));
  }

  #[test]
  fn capability_lookup_takes_first_match_in_registration_order() {
    let container = Container::default();
    container.register_capability::<dyn Hello, English>(|c| c);
    container.register_capability::<dyn Hello, German>(|c| c);

    container.register_value(TypeKey::of::<German>(None), Value::new(Arc::new(German)));
    container.register_value(TypeKey::of::<English>(None), Value::new(Arc::new(English)));

    let resolved = container.lookup(&hello_slot(DEFAULT_GROUP)).unwrap();
    let hello = resolved.capability_view::<dyn Hello>().unwrap();
    assert_eq!(hello.hello(), "hallo");

    // Overwriting keeps the original position.
    container.register_value(TypeKey::of::<German>(None), Value::new(Arc::new(German)));
    let resolved = container.lookup(&hello_slot(DEFAULT_GROUP)).unwrap();
    assert_eq!(resolved.value().ty(), SemanticType::of::<German>());
  }

  #[test]
  fn capability_lookup_is_scoped_to_group() {
    let container = Container::default();
    container.register_capability::<dyn Hello, English>(|c| c);
    container.register_value(TypeKey::of::<English>(Some("test")), Value::new(Arc::new(English)));

    assert!(container.lookup(&hello_slot(DEFAULT_GROUP)).is_none());
    assert!(container.lookup(&hello_slot("test")).is_some());
  }

  #[test]
  fn values_without_a_capability_do_not_match() {
    let container = Container::default();
    container.register_value(TypeKey::of::<English>(None), Value::new(Arc::new(English)));
    assert!(container.lookup(&hello_slot(DEFAULT_GROUP)).is_none());
  }

  #[test]
  fn rebinding_the_same_instance_keeps_container_clean() {
    let container = Container::default();
    let english = Value::new(Arc::new(English));
    container.register_value(TypeKey::of::<English>(None), english.clone());
    assert!(container.take_dirty());

    container.register_value(TypeKey::of::<English>(None), english);
    assert!(!container.is_dirty());

    container.register_value(TypeKey::of::<English>(None), Value::new(Arc::new(English)));
    assert!(container.is_dirty());
  }

  #[test]
  fn registration_marks_container_dirty() {
    let container = Container::default();
    assert!(!container.take_dirty());
    container.register_value(TypeKey::of::<English>(None), Value::new(Arc::new(English)));
    assert!(container.is_dirty());
    assert!(container.take_dirty());
    assert!(!container.is_dirty());
  }
}
