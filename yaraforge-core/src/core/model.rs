//! 规则数据模型定义
//! 规则请求 → 渲染输入 → 匹配记录，仅存储数据，转换逻辑保持最小

use serde::{Deserialize, Serialize};

use super::ordered_map::OrderedMap;
use crate::error::CoreResult;

/// 模式集合（`$name` → 字面值），保持声明顺序
pub type PatternSet = OrderedMap<String>;

/// 单个特征条目（前端设计器提交的结构）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub artifact: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ArtifactEntry {
    pub fn new(artifact: impl Into<String>, id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// 规则生成请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRequest {
    /// 原始规则名（未清洗）
    pub rule: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: OrderedMap<String>,
    #[serde(default)]
    pub artifacts: OrderedMap<ArtifactEntry>,
    pub condition: String,
}

impl RuleRequest {
    /// 从JSON文本解析规则请求
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从JSON字节流解析规则请求
    pub fn from_json_slice(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// 丢弃 id/type，仅保留 `变量名 → artifact`
    pub fn pattern_set(&self) -> PatternSet {
        self.artifacts
            .iter()
            .map(|(name, entry)| (name, entry.artifact.clone()))
            .collect()
    }

    /// 以清洗后的规则名构建渲染输入
    pub fn to_source(&self, rule_name: &str) -> RuleSource {
        RuleSource {
            rule: rule_name.to_string(),
            tags: Some(self.tags.clone()),
            meta: Some(self.meta.clone()),
            strings: Some(self.pattern_set()),
            condition: self.condition.clone(),
        }
    }
}

/// 渲染器输入
/// tags/meta/strings 为空或缺失时对应区块不输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<OrderedMap<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<PatternSet>,
    pub condition: String,
}

/// 编译规则回扫源文件得到的记录
/// 编译产物不保留条件表达式，condition 由调用方补回
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub rule: String,
    pub namespace: String,
    pub tags: Vec<String>,
    pub meta: OrderedMap<String>,
    /// 变量名 → 命中内容（已转义为规则字符串字面量）
    pub strings: PatternSet,
    pub condition: String,
    pub matches: bool,
}

impl MatchRecord {
    /// 补回条件表达式
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn to_source(&self) -> RuleSource {
        RuleSource {
            rule: self.rule.clone(),
            tags: Some(self.tags.clone()),
            meta: Some(self.meta.clone()),
            strings: Some(self.strings.clone()),
            condition: self.condition.clone(),
        }
    }
}
