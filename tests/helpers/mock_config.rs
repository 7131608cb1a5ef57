// ==========================================
// Mock 设置实现 - 用于集成测试
// ==========================================
// 说明: 测试中可随时修改设置，API 下次调用即读取新值
// ==========================================

use mrp_orders::config::{OrderSettings, OrderSettingsReader};
use std::error::Error;
use std::sync::Mutex;

/// 可变设置
#[derive(Debug, Default)]
pub struct MockSettings {
    inner: Mutex<OrderSettings>,
}

impl MockSettings {
    pub fn new(settings: OrderSettings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }

    /// 修改设置
    pub fn update<F: FnOnce(&mut OrderSettings)>(&self, f: F) {
        let mut guard = self.inner.lock().expect("设置锁获取失败");
        f(&mut guard);
    }
}

impl OrderSettingsReader for MockSettings {
    fn order_settings(&self) -> Result<OrderSettings, Box<dyn Error>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| format!("设置锁获取失败: {}", e))?;
        Ok(guard.clone())
    }
}

/// 始终读取失败的设置源
pub struct BrokenSettings;

impl OrderSettingsReader for BrokenSettings {
    fn order_settings(&self) -> Result<OrderSettings, Box<dyn Error>> {
        Err("配置表不可用".into())
    }
}
