//! Comic EPUB Maker：把漫画页面收集成本地“书”，并导出为固定版式 EPUB。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志等基础设施
//! - `storage`：持久化键值存储（`book` / `cache` 两个命名空间）
//! - `image_cache`：来源 URL → 缓存图片，以及图片抓取
//! - `book`：书籍模型与持久化
//! - `export`：页面解析与 EPUB 打包
//! - `ui`：命令行子命令

pub mod base_system;
pub mod book;
pub mod export;
pub mod image_cache;
pub mod storage;
pub mod ui;
