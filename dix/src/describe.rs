//! A read-only snapshot of a container, for diagnostics.

use crate::container::Container;
use crate::core::TypeKey;
use crate::node::InputShape;
use crate::options::environment;
use crate::value::InstanceId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
  pub key: TypeKey,
  pub instance: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
  pub origin: String,
  pub inputs: Vec<String>,
  pub outputs: Vec<TypeKey>,
  /// Whether the node has completed at least one invocation.
  pub invoked: bool,
}

/// The bindings (in registration order) and node shapes of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
  pub bindings: Vec<BindingInfo>,
  pub nodes: Vec<NodeInfo>,
  /// The `DIX_*` environment variables at capture time.
  pub env: Vec<(String, String)>,
}

impl Description {
  pub(crate) fn capture(container: &Container) -> Self {
    let bindings = container
      .bindings()
      .into_iter()
      .map(|(key, value)| BindingInfo {
        key,
        instance: value.id(),
      })
      .collect();

    let nodes = container
      .nodes()
      .iter()
      .map(|node| NodeInfo {
        origin: node.origin(),
        inputs: node.inputs().iter().map(render_input).collect(),
        outputs: node.output_keys(),
        invoked: node.has_invoked(),
      })
      .collect();

    Self {
      bindings,
      nodes,
      env: environment(),
    }
  }

  pub fn binding(&self, key: &TypeKey) -> Option<&BindingInfo> {
    self.bindings.iter().find(|binding| &binding.key == key)
  }
}

fn render_input(input: &InputShape) -> String {
  match input {
    InputShape::Simple(slot) => slot.to_string(),
    InputShape::Aggregate { fields, .. } => {
      let fields: Vec<String> = fields.iter().map(|(slot, _)| slot.to_string()).collect();
      format!("{{ {} }}", fields.join(", "))
    }
  }
}

impl fmt::Display for Description {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "bindings:")?;
    for binding in &self.bindings {
      writeln!(f, "  {} {}", binding.key, binding.instance)?;
    }
    writeln!(f, "nodes:")?;
    for node in &self.nodes {
      let state = if node.invoked { "invoked" } else { "pending" };
      writeln!(f, "  {} [{}]", node.origin, state)?;
      writeln!(f, "    in:  {}", node.inputs.join(", "))?;
      let outputs: Vec<String> = node.outputs.iter().map(ToString::to_string).collect();
      writeln!(f, "    out: {}", outputs.join(", "))?;
    }
    if !self.env.is_empty() {
      writeln!(f, "env:")?;
      for (name, value) in &self.env {
        writeln!(f, "  {}={}", name, value)?;
      }
    }
    Ok(())
  }
}
