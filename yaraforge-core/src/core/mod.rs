mod model;
mod ordered_map;

// 导出常用项
pub use model::{ArtifactEntry, MatchRecord, PatternSet, RuleRequest, RuleSource};
pub use ordered_map::OrderedMap;
