//! A registered function together with its derived shapes and invocation state.

use crate::container::Container;
use crate::core::{is_double_indirect, key_of, EvaluationGuard, TypeDescriptor, TypeKey, Wrapper};
use crate::error::{Error, Result};
use crate::function::{Arg, CallError, Function, Output, Signature};
use crate::value::{Resolved, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
  Concrete,
  Capability,
}

/// One dependency a node requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
  pub(crate) key: TypeKey,
  pub(crate) lookup: Lookup,
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.lookup {
      Lookup::Concrete => write!(f, "{}", self.key),
      Lookup::Capability => write!(f, "impl {}", self.key),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputShape {
  Simple(Slot),
  /// Required fields as `(slot, field index)`. Skipped fields are absent.
  Aggregate {
    field_count: usize,
    fields: Vec<(Slot, usize)>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputShape {
  Single(TypeKey),
  Fields(Vec<TypeKey>),
  Error,
}

/// Outcome of evaluating one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
  /// At least one dependency is absent.
  NotReady,
  /// Every input is the same instance as in the last successful invocation.
  Unchanged,
  Invoked,
}

pub(crate) struct Node {
  id: usize,
  function: Box<dyn Function>,
  signature: Signature,
  inputs: Vec<InputShape>,
  outputs: Vec<OutputShape>,
  // `None` until the first successful invocation. Holding the values pins their
  // allocations, which keeps identity comparison sound.
  last_inputs: Mutex<Option<Vec<Value>>>,
}

impl Node {
  pub(crate) fn new(function: Box<dyn Function>, strict: bool) -> Result<Self> {
    let signature = function.signature();
    let origin = function.origin().to_string();
    let inputs = derive_inputs(&signature.inputs, strict, &origin)?;
    let outputs = derive_outputs(&signature.outputs, &origin)?;
    Ok(Self {
      id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
      function,
      signature,
      inputs,
      outputs,
      last_inputs: Mutex::new(None),
    })
  }

  pub(crate) fn origin(&self) -> String {
    self.function.origin().to_string()
  }

  pub(crate) fn inputs(&self) -> &[InputShape] {
    &self.inputs
  }

  pub(crate) fn output_keys(&self) -> Vec<TypeKey> {
    self
      .outputs
      .iter()
      .flat_map(|shape| match shape {
        OutputShape::Single(key) => vec![key.clone()],
        OutputShape::Fields(keys) => keys.clone(),
        OutputShape::Error => Vec::new(),
      })
      .collect()
  }

  pub(crate) fn has_invoked(&self) -> bool {
    self.last_inputs.lock().is_some()
  }

  pub(crate) fn evaluate(&self, container: &Container, trace: bool) -> Result<Evaluation> {
    let Some(_guard) = EvaluationGuard::enter(self.id) else {
      return Ok(Evaluation::NotReady);
    };

    let Some((args, observed)) = self.resolve(container, trace) else {
      return Ok(Evaluation::NotReady);
    };

    if self.unchanged(&observed) {
      if trace {
        tracing::debug!(node = %self.function.origin(), "inputs unchanged, skipping");
      }
      return Ok(Evaluation::Unchanged);
    }

    self.check_trailing_error()?;

    if trace {
      tracing::debug!(node = %self.function.origin(), params = %render(&observed), "invoking");
    }

    let outputs = match self.function.invoke(args) {
      Ok(outputs) => outputs,
      Err(CallError::Failed(source)) => {
        tracing::warn!(node = %self.function.origin(), error = %source, "provider returned an error");
        return Err(Error::ProviderInvocation {
          origin: self.origin(),
          params: render(&observed),
          source,
        });
      }
      Err(CallError::Mismatch { index, expected }) => {
        return Err(Error::ArgumentMismatch {
          origin: self.origin(),
          index,
          expected: expected.to_owned(),
        });
      }
    };

    let bindings = self.match_outputs(outputs)?;
    for (key, value) in bindings {
      if trace {
        tracing::debug!(node = %self.function.origin(), key = %key, instance = %value.id(), "binding output");
      }
      container.register_value(key, value);
    }

    *self.last_inputs.lock() = Some(observed);
    Ok(Evaluation::Invoked)
  }

  /// Resolves every input, returning the call arguments and the flat
  /// identity sequence used for change detection. `None` if anything is absent.
  fn resolve(&self, container: &Container, trace: bool) -> Option<(Vec<Arg>, Vec<Value>)> {
    let mut args = Vec::with_capacity(self.inputs.len());
    let mut observed = Vec::new();

    for input in &self.inputs {
      match input {
        InputShape::Simple(slot) => {
          let resolved = self.require(container, slot, trace)?;
          observed.push(resolved.value().clone());
          args.push(Arg::Simple(resolved));
        }
        InputShape::Aggregate {
          field_count,
          fields,
        } => {
          let mut slots: Vec<Option<Resolved>> = vec![None; *field_count];
          let mut labeled: Vec<(&str, Value)> = Vec::with_capacity(fields.len());
          for (slot, index) in fields {
            let resolved = self.require(container, slot, trace)?;
            labeled.push((slot.key.group.as_str(), resolved.value().clone()));
            slots[*index] = Some(resolved);
          }
          // Descending by label, independent of field declaration order.
          labeled.sort_by(|a, b| b.0.cmp(a.0));
          observed.extend(labeled.into_iter().map(|(_, value)| value));
          args.push(Arg::Aggregate(slots));
        }
      }
    }

    Some((args, observed))
  }

  fn require(&self, container: &Container, slot: &Slot, trace: bool) -> Option<Resolved> {
    let resolved = container.lookup(slot);
    if resolved.is_none() && trace {
      tracing::debug!(node = %self.function.origin(), missing = %slot, "not ready");
    }
    resolved
  }

  fn unchanged(&self, observed: &[Value]) -> bool {
    match self.last_inputs.lock().as_deref() {
      Some(last) => {
        last.len() == observed.len()
          && last
            .iter()
            .zip(observed)
            .all(|(a, b)| a.same_instance(b))
      }
      None => false,
    }
  }

  fn check_trailing_error(&self) -> Result<()> {
    match self.signature.outputs.last() {
      Some(TypeDescriptor::Error) | None => Ok(()),
      Some(found) => Err(Error::InvalidSignature {
        origin: self.origin(),
        found: found.to_string(),
      }),
    }
  }

  /// Pairs produced values with the derived output keys, validating everything
  /// before anything is bound.
  fn match_outputs(&self, outputs: Vec<Output>) -> Result<Vec<(TypeKey, Value)>> {
    let shapes: Vec<&OutputShape> = self
      .outputs
      .iter()
      .filter(|shape| !matches!(shape, OutputShape::Error))
      .collect();

    if shapes.len() != outputs.len() {
      return Err(self.malformed(format!(
        "declared {} non-error outputs but returned {}",
        shapes.len(),
        outputs.len()
      )));
    }

    let mut bindings = Vec::new();
    for (shape, output) in shapes.into_iter().zip(outputs) {
      match (shape, output) {
        (OutputShape::Single(key), Output::Single(value)) => {
          self.check_output_type(key, &value)?;
          bindings.push((key.clone(), value));
        }
        (OutputShape::Fields(keys), Output::Fields(values)) if keys.len() == values.len() => {
          for (key, value) in keys.iter().zip(values) {
            if let Some(value) = value {
              self.check_output_type(key, &value)?;
              bindings.push((key.clone(), value));
            }
          }
        }
        (shape, output) => {
          return Err(self.malformed(format!(
            "returned value {:?} does not match declared output {:?}",
            output, shape
          )));
        }
      }
    }
    Ok(bindings)
  }

  fn check_output_type(&self, key: &TypeKey, value: &Value) -> Result<()> {
    if key.ty == value.ty() {
      Ok(())
    } else {
      Err(self.malformed(format!(
        "returned a `{}` where `{}` was declared",
        value.ty(),
        key.ty
      )))
    }
  }

  fn malformed(&self, reason: String) -> Error {
    Error::MalformedType {
      origin: self.origin(),
      reason,
    }
  }
}

fn render(values: &[Value]) -> String {
  values
    .iter()
    .map(|value| format!("{:?}", value))
    .collect::<Vec<_>>()
    .join(", ")
}

fn lookup_for(ty: &TypeDescriptor) -> Lookup {
  match ty.strip() {
    TypeDescriptor::Interface(_) => Lookup::Capability,
    _ => Lookup::Concrete,
  }
}

/// Derives the input shape of a function from its parameter descriptors.
pub(crate) fn derive_inputs(inputs: &[TypeDescriptor], strict: bool, origin: &str) -> Result<Vec<InputShape>> {
  let malformed = |reason: String| Error::MalformedType {
    origin: origin.to_owned(),
    reason,
  };

  inputs
    .iter()
    .map(|input| match input {
      TypeDescriptor::Interface(_) | TypeDescriptor::Wrapped(Wrapper::Pointer, _) => {
        let key = key_of(input, None)
          .ok_or_else(|| malformed(format!("parameter `{}` has no semantic type", input)))?;
        Ok(InputShape::Simple(Slot {
          key,
          lookup: lookup_for(input),
        }))
      }
      TypeDescriptor::Struct(structure) => {
        let mut fields = Vec::with_capacity(structure.fields.len());
        for (index, field) in structure.fields.iter().enumerate() {
          if strict && !field.is_labeled() {
            if !field.optional {
              return Err(malformed(format!(
                "field `{}` of {} has no group label, so strict mode never populates it; make it optional",
                field.name, structure.ty
              )));
            }
            continue;
          }
          let key = key_of(&field.ty, field.label.as_deref()).ok_or_else(|| {
            malformed(format!("field `{}` of {} has no semantic type", field.name, structure.ty))
          })?;
          fields.push((
            Slot {
              key,
              lookup: lookup_for(&field.ty),
            },
            index,
          ));
        }
        Ok(InputShape::Aggregate {
          field_count: structure.fields.len(),
          fields,
        })
      }
      other => Err(malformed(format!(
        "incorrect input parameter type, got {} `{}`",
        other.kind(),
        other
      ))),
    })
    .collect()
}

/// Derives the output shape of a function from its return descriptors.
pub(crate) fn derive_outputs(outputs: &[TypeDescriptor], origin: &str) -> Result<Vec<OutputShape>> {
  let malformed = |reason: String| Error::MalformedType {
    origin: origin.to_owned(),
    reason,
  };

  outputs
    .iter()
    .map(|output| match output {
      TypeDescriptor::Wrapped(Wrapper::Pointer, _) => {
        if is_double_indirect(output) {
          return Err(malformed(format!("returned pointer `{}` is double indirect", output)));
        }
        key_of(output, None)
          .map(OutputShape::Single)
          .ok_or_else(|| malformed(format!("returned `{}` has no semantic type", output)))
      }
      TypeDescriptor::Struct(structure) => structure
        .fields
        .iter()
        .map(|field| match &field.ty {
          ty if matches!(ty, TypeDescriptor::Wrapped(Wrapper::Pointer, _)) && !is_double_indirect(ty) => {
            key_of(ty, field.label.as_deref()).ok_or_else(|| {
              malformed(format!("field `{}` of {} has no semantic type", field.name, structure.ty))
            })
          }
          ty => Err(malformed(format!(
            "the struct field `{}` of {} should be a pointer, got {} `{}`",
            field.name,
            structure.ty,
            ty.kind(),
            ty
          ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(OutputShape::Fields),
      TypeDescriptor::Error => Ok(OutputShape::Error),
      other => Err(Error::UnsupportedReturnKind {
        origin: origin.to_owned(),
        kind: format!("{} `{}`", other.kind(), other),
      }),
    })
    .collect()
}
