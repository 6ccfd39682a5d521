pub mod catalog;
pub mod extract;
pub mod graph;
pub mod graph_builder;
pub mod loader;
pub mod rule;

pub use catalog::{RuleCatalog, load_all};
pub use extract::DependencyExtractor;
pub use graph::{Edge, NodeType, RuleGraph};
pub use graph_builder::{GraphBuilder, build_rule_graph};
pub use loader::{RuleFileLoader, YamlRuleLoader};
pub use promgraph_error::{CompoundError, Error, ErrorKind, Result};
pub use rule::{Rule, RuleGroup, RuleKind};
