// crates/erf_foundation/src/lib.rs

//! ERF Foundation Layer
//!
//! 基础层，提供整个破裂预测工作区共用的抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型与三类错误分类
//! - [`weighted`]: 归一化权重列表
//! - [`lazy`]: 代际懒加载单元（派生状态的双重检查构建）
//!
//! # 设计原则
//!
//! 1. **最少依赖**: 仅依赖 thiserror、parking_lot 与 log
//! 2. **显式失败**: 前置条件违例立即报错，从不静默截断
//! 3. **代际一致**: 派生缓存记录其构建代际，代际变化即重建
//!
//! # 示例
//!
//! ```
//! use erf_foundation::prelude::*;
//!
//! let corrections = WeightedList::new(vec![("near", 0.5), ("far", 0.5)]).unwrap();
//! assert!(corrections.is_normalized());
//!
//! let err = EfError::check_index("source", 3, 3).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Precondition);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod lazy;
pub mod weighted;

// 重导出常用类型
pub use error::{EfError, EfResult, ErrorKind};
pub use lazy::GenerationCell;
pub use weighted::{WeightedList, WeightedValue};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{EfError, EfResult, ErrorKind};
    pub use crate::lazy::GenerationCell;
    pub use crate::weighted::{is_normalized_sum, WeightedList, WeightedValue};
}
