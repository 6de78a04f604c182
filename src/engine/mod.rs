//! 引擎模块：外部编译/匹配引擎的适配边界
pub mod compiled;
pub mod yara_engine;

pub use self::compiled::CompiledRules;
pub use self::yara_engine::{CallbackMsg, RuleEngine, YaraXEngine};
