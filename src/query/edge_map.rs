use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{NodeId, PathStep};
use crate::value::Value;

/// Separator between the components of a parameterized node id. Must not
/// occur inside any container id.
pub const PARAMETERIZED_ID_SEPARATOR: char = '\u{2756}';

/// A static argument expression attached to a parameterized field. Variable
/// references are resolved against the write's bound variables at merge time.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgExpr {
    Scalar(Value),
    Variable(String),
    List(Vec<ArgExpr>),
    Object(BTreeMap<String, ArgExpr>),
}

impl From<Value> for ArgExpr {
    fn from(value: Value) -> Self {
        ArgExpr::Scalar(value)
    }
}

/// Marker for a parameterized field position in the edge map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterizedEdge {
    pub args: BTreeMap<String, ArgExpr>,
}

impl ParameterizedEdge {
    pub fn new(args: impl IntoIterator<Item = (&'static str, ArgExpr)>) -> Self {
        Self {
            args: args
                .into_iter()
                .map(|(name, expr)| (name.to_owned(), expr))
                .collect(),
        }
    }
}

/// One position in the edge map. Mirrors the query's selection set: field
/// steps descend into `children`, array indices stay on the same node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeMapNode {
    pub parameterized: Option<ParameterizedEdge>,
    pub children: BTreeMap<String, EdgeMapNode>,
}

impl EdgeMapNode {
    pub fn parameterized(edge: ParameterizedEdge) -> Self {
        Self {
            parameterized: Some(edge),
            children: BTreeMap::new(),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: EdgeMapNode) -> Self {
        self.children.insert(name.into(), child);
        self
    }
}

/// Per-document description of which field positions are parameterized,
/// produced by the external query parser and consumed opaquely here. Also
/// carries the document's declared variable defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeMap {
    pub root: EdgeMapNode,
    pub variable_defaults: BTreeMap<String, Value>,
}

impl EdgeMap {
    pub fn new(root: EdgeMapNode) -> Self {
        Self {
            root,
            variable_defaults: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variable_defaults.insert(name.into(), value);
        self
    }
}

/// Expands a static argument map against bound variables, falling back to the
/// document's defaults. Unbound variables expand to `Null`.
pub(crate) fn expand_args(
    args: &BTreeMap<String, ArgExpr>,
    variables: &BTreeMap<String, Value>,
    defaults: &BTreeMap<String, Value>,
) -> Value {
    let fields = args
        .iter()
        .map(|(name, expr)| (name.clone(), Arc::new(expand_expr(expr, variables, defaults))))
        .collect();
    Value::Map(fields)
}

fn expand_expr(
    expr: &ArgExpr,
    variables: &BTreeMap<String, Value>,
    defaults: &BTreeMap<String, Value>,
) -> Value {
    match expr {
        ArgExpr::Scalar(value) => value.clone(),
        ArgExpr::Variable(name) => variables
            .get(name)
            .or_else(|| defaults.get(name))
            .cloned()
            .unwrap_or(Value::Null),
        ArgExpr::List(items) => Value::Array(
            items
                .iter()
                .map(|item| Some(Arc::new(expand_expr(item, variables, defaults))))
                .collect(),
        ),
        ArgExpr::Object(fields) => Value::Map(
            fields
                .iter()
                .map(|(name, item)| (name.clone(), Arc::new(expand_expr(item, variables, defaults))))
                .collect(),
        ),
    }
}

/// Builds the deterministic composite id for a parameterized value:
/// `{container}❖{JSON(path)}❖{JSON(args)}`. Key order inside the argument
/// JSON is sorted, so the id is stable regardless of insertion order.
///
/// The separator is reserved: a host-provided container id (entity or root)
/// must not contain it, or distinct positions can collide. Containers that
/// are themselves derived parameterized ids are the one sanctioned
/// exception, which is what nested parameterized fields produce.
pub fn parameterized_id(container: &NodeId, path: &[PathStep], args: &Value) -> Result<NodeId> {
    debug_assert!(
        !container.as_str().contains(PARAMETERIZED_ID_SEPARATOR)
            || is_derived_parameterized_id(container.as_str()),
        "container id {container} contains the reserved separator U+2756",
    );
    let path_json = serde_json::to_string(path)?;
    let args_json = serde_json::to_string(args)?;
    Ok(NodeId::new(format!(
        "{container}{sep}{path_json}{sep}{args_json}",
        sep = PARAMETERIZED_ID_SEPARATOR,
    )))
}

/// True when `id` has the trailing `❖{JSON(path)}❖{JSON(args)}` structure
/// that [`parameterized_id`] produces.
fn is_derived_parameterized_id(id: &str) -> bool {
    let mut parts = id.rsplitn(3, PARAMETERIZED_ID_SEPARATOR);
    let args = parts.next();
    let path = parts.next();
    let container = parts.next();
    container.is_some()
        && args
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .is_some_and(|value| value.is_object())
        && path
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .is_some_and(|value| value.is_array())
}
