use std::collections::HashSet;
use std::sync::Arc;

use super::{DynTool, Tool, ToolKind};
use crate::models::ToolSchema;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is registered more than once")]
    DuplicateTool(String),
}

/// Immutable set of tools, built once at startup.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DynTool>>,
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn DynTool>>,
}

impl ToolRegistryBuilder {
    pub fn register<T: Tool>(self, tool: T) -> Self {
        self.register_dyn(Arc::new(tool))
    }

    pub fn register_dyn(mut self, tool: Arc<dyn DynTool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Fails if two tools share a kind or a name.
    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        let mut kinds = HashSet::new();
        let mut names = HashSet::new();
        for tool in &self.tools {
            let name = tool.schema().name;
            if !kinds.insert(tool.kind()) || !names.insert(name.clone()) {
                return Err(RegistryError::DuplicateTool(name));
            }
        }
        Ok(ToolRegistry { tools: self.tools })
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// `None` is the not-found signal for names the model invents.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DynTool>> {
        self.tools.iter().find(|t| t.kind().name() == name).cloned()
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn DynTool>> {
        self.tools.iter().find(|t| t.kind() == kind).cloned()
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        self.tools.iter().map(|t| t.kind()).collect()
    }

    /// Schemas of the requested kinds that are registered, in the requested order.
    pub fn schemas(&self, kinds: &[ToolKind]) -> Vec<ToolSchema> {
        kinds
            .iter()
            .filter_map(|k| self.get(*k))
            .map(|t| t.schema())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
