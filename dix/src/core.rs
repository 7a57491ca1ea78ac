//! Core data structures: semantic types, type descriptors and dependency keys.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The namespace used when no explicit group label is present.
pub const DEFAULT_GROUP: &str = "default";

thread_local! {
  // Nodes whose function body is currently running on this thread. A provider
  // that injects into its own container must not re-enter itself.
  static EVALUATING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// An RAII guard marking a node as "being evaluated" on the current thread.
///
/// `enter` returns `None` if the node is already on the evaluation stack, in
/// which case the nested evaluation treats the node as not ready.
pub(crate) struct EvaluationGuard {
  node: usize,
}

impl EvaluationGuard {
  pub(crate) fn enter(node: usize) -> Option<Self> {
    EVALUATING.with(|stack| {
      if stack.borrow_mut().insert(node) {
        Some(Self { node })
      } else {
        None
      }
    })
  }
}

impl Drop for EvaluationGuard {
  fn drop(&mut self) {
    EVALUATING.with(|stack| {
      stack.borrow_mut().remove(&self.node);
    });
  }
}

/// The identity of a Rust type, with its name kept around for diagnostics.
///
/// Equality and hashing only consider the `TypeId`.
#[derive(Clone, Copy)]
pub struct SemanticType {
  id: TypeId,
  name: &'static str,
}

impl SemanticType {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for SemanticType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for SemanticType {}

impl Hash for SemanticType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for SemanticType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

impl fmt::Display for SemanticType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// A layer of indirection around an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapper {
  Pointer,
  Slice,
  Map,
  Array,
  Chan,
}

impl Wrapper {
  fn prefix(self) -> &'static str {
    match self {
      Wrapper::Pointer => "*",
      Wrapper::Slice => "[]",
      Wrapper::Map => "map[_]",
      Wrapper::Array => "[_]",
      Wrapper::Chan => "chan ",
    }
  }
}

/// Describes the declared type of a parameter, a return value or a struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
  /// A plain named type, addressed through a pointer.
  Concrete(SemanticType),
  /// A capability set (a trait object type).
  Interface(SemanticType),
  /// A struct whose fields are individually keyed dependencies.
  Struct(StructDescriptor),
  /// An error-capable value. Never bound.
  Error,
  /// A wrapper layer around another descriptor.
  Wrapped(Wrapper, Box<TypeDescriptor>),
}

impl TypeDescriptor {
  pub fn concrete<T: ?Sized + Any>() -> Self {
    TypeDescriptor::Concrete(SemanticType::of::<T>())
  }

  pub fn interface<I: ?Sized + Any>() -> Self {
    TypeDescriptor::Interface(SemanticType::of::<I>())
  }

  /// A pointer to the concrete type `T`.
  pub fn pointer<T: ?Sized + Any>() -> Self {
    Self::concrete::<T>().wrap(Wrapper::Pointer)
  }

  pub fn wrap(self, wrapper: Wrapper) -> Self {
    TypeDescriptor::Wrapped(wrapper, Box::new(self))
  }

  pub fn is_wrapper(&self) -> bool {
    matches!(self, TypeDescriptor::Wrapped(..))
  }

  /// Removes every wrapper layer, yielding the element type.
  pub fn strip(&self) -> &TypeDescriptor {
    let mut ty = self;
    while let TypeDescriptor::Wrapped(_, inner) = ty {
      ty = inner;
    }
    ty
  }

  /// The semantic type after stripping, if the descriptor has one.
  pub fn semantic(&self) -> Option<SemanticType> {
    match self.strip() {
      TypeDescriptor::Concrete(ty) | TypeDescriptor::Interface(ty) => Some(*ty),
      TypeDescriptor::Struct(s) => Some(s.ty),
      TypeDescriptor::Error | TypeDescriptor::Wrapped(..) => None,
    }
  }

  /// A short name for the outermost layer, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      TypeDescriptor::Concrete(_) => "concrete",
      TypeDescriptor::Interface(_) => "interface",
      TypeDescriptor::Struct(_) => "struct",
      TypeDescriptor::Error => "error",
      TypeDescriptor::Wrapped(Wrapper::Pointer, _) => "pointer",
      TypeDescriptor::Wrapped(Wrapper::Slice, _) => "slice",
      TypeDescriptor::Wrapped(Wrapper::Map, _) => "map",
      TypeDescriptor::Wrapped(Wrapper::Array, _) => "array",
      TypeDescriptor::Wrapped(Wrapper::Chan, _) => "chan",
    }
  }
}

impl fmt::Display for TypeDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypeDescriptor::Concrete(ty) => write!(f, "{}", ty),
      TypeDescriptor::Interface(ty) => write!(f, "{}", ty),
      TypeDescriptor::Struct(s) => write!(f, "struct {}", s.ty),
      TypeDescriptor::Error => f.write_str("error"),
      TypeDescriptor::Wrapped(w, inner) => write!(f, "{}{}", w.prefix(), inner),
    }
  }
}

/// The fields of a struct-shaped parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
  pub ty: SemanticType,
  pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
  pub fn of<S: Any>(fields: Vec<FieldDescriptor>) -> Self {
    Self {
      ty: SemanticType::of::<S>(),
      fields,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
  pub name: String,
  /// The namespace label. `Some("")` counts as labeled but maps to the default group.
  pub label: Option<String>,
  pub ty: TypeDescriptor,
  /// Whether the field may stay unpopulated when strict mode skips it.
  pub optional: bool,
}

impl FieldDescriptor {
  pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
    Self {
      name: name.into(),
      label: None,
      ty,
      optional: false,
    }
  }

  pub fn group(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn is_labeled(&self) -> bool {
    self.label.is_some()
  }

  /// The field's effective namespace.
  pub fn namespace(&self) -> String {
    group_of(self.label.as_deref())
  }
}

/// Identifies a dependency slot: a semantic type within a group.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
  pub ty: SemanticType,
  pub group: String,
}

impl TypeKey {
  pub fn new(ty: SemanticType, group: impl Into<String>) -> Self {
    Self {
      ty,
      group: group.into(),
    }
  }

  pub fn of<T: ?Sized + Any>(label: Option<&str>) -> Self {
    Self::new(SemanticType::of::<T>(), group_of(label))
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key(Type({}), Group({}))", self.ty, self.group)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.ty, self.group)
  }
}

/// Maps an optional label to a group name; empty or missing labels mean the default group.
pub fn group_of(label: Option<&str>) -> String {
  match label {
    Some(label) if !label.is_empty() => label.to_owned(),
    _ => DEFAULT_GROUP.to_owned(),
  }
}

/// Computes the dependency key of a declared type, stripping all wrapper layers.
///
/// Returns `None` for descriptors without a semantic type (errors).
pub fn key_of(ty: &TypeDescriptor, label: Option<&str>) -> Option<TypeKey> {
  ty.semantic().map(|semantic| TypeKey::new(semantic, group_of(label)))
}

/// True if stripping one wrapper layer still leaves a wrapper.
pub fn is_double_indirect(ty: &TypeDescriptor) -> bool {
  match ty {
    TypeDescriptor::Wrapped(_, inner) => inner.is_wrapper(),
    _ => false,
  }
}
