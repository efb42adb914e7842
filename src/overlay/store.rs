//! # 配置存储（ConfigStore）
//!
//! ## 设计思路
//!
//! 设置界面线程写配置，照片/视频绘制线程读配置。读方只在极短的读锁内
//! 克隆一个 `Arc<OverlayConfig>`，之后的整个绘制过程都使用这份快照，
//! 不再持有任何锁，也不会看到"改了一半"的配置。
//!
//! ## 实现思路
//!
//! - `replace` 在锁外校验整份新配置，只在替换 `Arc` 时短暂持有写锁
//! - `update` 的克隆、修改、校验都在写锁内完成，并发的增量修改按顺序生效，
//!   不会互相覆盖；校验失败时写锁内的旧配置原样保留
//! - 锁中毒映射为 `StoreError::Poisoned`，不 panic

use std::sync::{Arc, RwLock};

use super::config::{ConfigError, OverlayConfig};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("配置锁已中毒：{0}")]
    Poisoned(String),

    #[error("{0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Arc<OverlayConfig>>,
}

impl ConfigStore {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次绘制使用一致参数。
    pub fn snapshot(&self) -> Result<Arc<OverlayConfig>, StoreError> {
        self.current
            .read()
            .map(|cfg| Arc::clone(&cfg))
            .map_err(|_| StoreError::Poisoned("配置读取锁已中毒".to_string()))
    }

    /// 校验后整体替换配置。
    pub fn replace(&self, config: OverlayConfig) -> Result<(), StoreError> {
        config.validate()?;
        let mut guard = self
            .current
            .write()
            .map_err(|_| StoreError::Poisoned("配置写入锁已中毒".to_string()))?;
        *guard = Arc::new(config);
        log::info!("⚙️ 水印配置已更新");
        Ok(())
    }

    /// 在当前配置的副本上修改，校验通过后替换，返回新快照。
    ///
    /// # 示例
    /// ```rust
    /// use geostamp::overlay::{ConfigStore, OverlayConfig};
    ///
    /// let store = ConfigStore::new(OverlayConfig::default());
    /// let updated = store.update(|cfg| cfg.opacity = 128).unwrap();
    /// assert_eq!(updated.opacity, 128);
    /// ```
    pub fn update<F>(&self, mutate: F) -> Result<Arc<OverlayConfig>, StoreError>
    where
        F: FnOnce(&mut OverlayConfig),
    {
        let mut guard = self
            .current
            .write()
            .map_err(|_| StoreError::Poisoned("配置写入锁已中毒".to_string()))?;
        let mut next = OverlayConfig::clone(&guard);
        mutate(&mut next);
        next.validate()?;
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        log::info!("⚙️ 水印配置已更新");
        Ok(next)
    }
}
