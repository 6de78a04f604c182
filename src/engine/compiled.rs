//! 编译产物封装
//! 二进制形式不保留条件表达式

use std::fmt;

use crate::error::{YaraForgeError, YfResult};

/// 编译后的规则集（外部引擎的不透明产物）
pub struct CompiledRules {
    rules: yara_x::Rules,
}

impl CompiledRules {
    pub(crate) fn new(rules: yara_x::Rules) -> Self {
        Self { rules }
    }

    pub(crate) fn as_rules(&self) -> &yara_x::Rules {
        &self.rules
    }

    /// 序列化为二进制
    pub fn to_bytes(&self) -> YfResult<Vec<u8>> {
        self.rules
            .serialize()
            .map_err(|e| YaraForgeError::CompiledFormat(format!("serialize failed: {}", e)))
    }

    /// 从二进制反序列化
    pub fn from_bytes(bytes: &[u8]) -> YfResult<Self> {
        yara_x::Rules::deserialize(bytes)
            .map(Self::new)
            .map_err(|e| YaraForgeError::CompiledFormat(format!("deserialize failed: {}", e)))
    }
}

impl fmt::Debug for CompiledRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRules").finish_non_exhaustive()
    }
}
