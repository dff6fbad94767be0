//! 交互层。

pub mod noui;
