// crates/erf_foundation/src/lazy.rs

//! 代际懒加载单元
//!
//! `GenerationCell<T>` 是派生状态（偏移表、距离缓存源列表等）的共享容器，
//! 状态机为三态：
//!
//! ```text
//! Uninitialized ──get_or_build──> Building ──成功──> Ready(generation, Arc<T>)
//!       ^                            │
//!       └────────────失败────────────┘
//! ```
//!
//! - 每个单元只有一把互斥锁，配合条件变量；
//! - 已就绪且代际匹配时走快速路径，直接克隆 `Arc`；
//! - 同一时刻只有一个线程执行构建，构建在锁外进行，其余线程在 Building 状态下等待；
//! - `invalidate` 一次性清除整个值（值与其附属数据作为一个整体存放，
//!   读者不会看到新旧混合的状态），并推进内部纪元，使进行中的构建无法发布过期结果；
//! - 构建闭包 panic 时由守卫把状态退回 Uninitialized 并唤醒等待者。
//!
//! # 示例
//!
//! ```
//! use erf_foundation::lazy::GenerationCell;
//!
//! let cell: GenerationCell<Vec<usize>> = GenerationCell::new();
//! let v = cell.get_or_build(1, || Ok(vec![0, 0, 2])).unwrap();
//! assert_eq!(v.len(), 3);
//!
//! // 代际不变时不会重建
//! let again = cell.get_or_build(1, || unreachable!()).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&v, &again));
//! ```

use crate::error::EfResult;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// 单元内部状态
#[derive(Debug)]
enum CellState<T> {
    /// 未初始化
    Uninitialized,
    /// 正在构建
    Building {
        /// 构建所针对的代际
        generation: u64,
    },
    /// 已就绪
    Ready {
        /// 值所对应的代际
        generation: u64,
        /// 共享值
        value: Arc<T>,
    },
}

#[derive(Debug)]
struct Inner<T> {
    state: CellState<T>,
    /// 每次 invalidate 递增
    epoch: u64,
}

/// 带代际校验的三态懒加载单元
#[derive(Debug)]
pub struct GenerationCell<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

impl<T> Default for GenerationCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GenerationCell<T> {
    /// 创建未初始化单元
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CellState::Uninitialized,
                epoch: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// 获取指定代际的值，必要时构建
    ///
    /// 构建失败时单元回到未初始化状态并返回错误，等待中的线程会重新竞争构建。
    pub fn get_or_build<F>(&self, generation: u64, build: F) -> EfResult<Arc<T>>
    where
        F: FnOnce() -> EfResult<T>,
    {
        let mut inner = self.inner.lock();
        loop {
            match &inner.state {
                CellState::Ready {
                    generation: g,
                    value,
                } if *g == generation => return Ok(Arc::clone(value)),
                CellState::Building { .. } => self.ready.wait(&mut inner),
                _ => break,
            }
        }

        inner.state = CellState::Building { generation };
        let epoch = inner.epoch;
        drop(inner);

        let guard = BuildGuard {
            cell: self,
            armed: true,
        };
        let result = build();
        guard.disarm();

        let mut inner = self.inner.lock();
        let out = match result {
            Ok(value) => {
                let value = Arc::new(value);
                if inner.epoch == epoch {
                    inner.state = CellState::Ready {
                        generation,
                        value: Arc::clone(&value),
                    };
                } else {
                    // 构建期间被作废：结果只交给本次调用者，不发布
                    log::debug!("GenerationCell: 构建期间被作废, 丢弃代际 {} 的结果", generation);
                    if matches!(inner.state, CellState::Building { .. }) {
                        inner.state = CellState::Uninitialized;
                    }
                }
                Ok(value)
            }
            Err(err) => {
                if matches!(inner.state, CellState::Building { .. }) {
                    inner.state = CellState::Uninitialized;
                }
                Err(err)
            }
        };
        drop(inner);
        self.ready.notify_all();
        out
    }

    /// 若已就绪则返回当前值（不检查代际，不触发构建）
    pub fn peek(&self) -> Option<Arc<T>> {
        match &self.inner.lock().state {
            CellState::Ready { value, .. } => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// 已就绪值对应的代际
    pub fn ready_generation(&self) -> Option<u64> {
        match &self.inner.lock().state {
            CellState::Ready { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// 作废当前值
    ///
    /// 进行中的构建会继续完成，但其结果不会被发布。
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.epoch = inner.epoch.wrapping_add(1);
        if !matches!(inner.state, CellState::Building { .. }) {
            inner.state = CellState::Uninitialized;
        }
    }

    /// 是否已就绪
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.lock().state, CellState::Ready { .. })
    }

    /// 放弃进行中的构建，唤醒等待者重新竞争
    fn abandon_build(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.state, CellState::Building { .. }) {
            inner.state = CellState::Uninitialized;
        }
        drop(inner);
        self.ready.notify_all();
    }
}

/// 构建展开（panic）时的状态复位守卫
struct BuildGuard<'a, T> {
    cell: &'a GenerationCell<T>,
    armed: bool,
}

impl<T> BuildGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for BuildGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("GenerationCell: 构建异常中止, 复位为未初始化");
            self.cell.abandon_build();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EfError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_builds_once_per_generation() {
        let cell = GenerationCell::new();
        let builds = AtomicUsize::new(0);
        for _ in 0..5 {
            let v = cell
                .get_or_build(7, || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(42_u32)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cell.ready_generation(), Some(7));
    }

    #[test]
    fn test_rebuilds_on_new_generation() {
        let cell = GenerationCell::new();
        assert_eq!(*cell.get_or_build(1, || Ok(1)).unwrap(), 1);
        assert_eq!(*cell.get_or_build(2, || Ok(2)).unwrap(), 2);
        assert_eq!(cell.ready_generation(), Some(2));
    }

    #[test]
    fn test_invalidate_clears() {
        let cell = GenerationCell::new();
        cell.get_or_build(1, || Ok("a")).unwrap();
        assert!(cell.is_ready());
        cell.invalidate();
        assert!(!cell.is_ready());
        assert!(cell.peek().is_none());
        assert_eq!(*cell.get_or_build(1, || Ok("b")).unwrap(), "b");
    }

    #[test]
    fn test_failed_build_resets() {
        let cell: GenerationCell<u8> = GenerationCell::new();
        let err = cell
            .get_or_build(1, || Err(EfError::internal("boom")))
            .unwrap_err();
        assert!(err.is_internal());
        assert!(!cell.is_ready());
        assert_eq!(*cell.get_or_build(1, || Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_panicking_build_releases_waiters() {
        let cell: GenerationCell<u8> = GenerationCell::new();
        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cell.get_or_build(1, || -> EfResult<u8> { panic!("构建崩溃") })
        }));
        assert!(crashed.is_err());
        assert!(!cell.is_ready());
        assert_eq!(*cell.get_or_build(1, || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_panicking_build_wakes_blocked_thread() {
        let cell: GenerationCell<u8> = GenerationCell::new();
        let started = Barrier::new(2);
        let value = std::thread::scope(|scope| {
            let builder = scope.spawn(|| {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    cell.get_or_build(1, || -> EfResult<u8> {
                        started.wait();
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        panic!("构建崩溃")
                    })
                }))
                .is_err()
            });
            started.wait();
            let waiter = scope.spawn(|| *cell.get_or_build(1, || Ok(9)).unwrap());
            assert!(builder.join().unwrap());
            waiter.join().unwrap()
        });
        assert_eq!(value, 9);
        assert_eq!(cell.ready_generation(), Some(1));
    }

    #[test]
    fn test_invalidate_during_build_discards_result() {
        let cell: GenerationCell<u32> = GenerationCell::new();
        let gate = Barrier::new(2);
        std::thread::scope(|scope| {
            let builder = scope.spawn(|| {
                cell.get_or_build(1, || {
                    gate.wait();
                    gate.wait();
                    Ok(1)
                })
                .unwrap()
            });
            // 构建已开始
            gate.wait();
            cell.invalidate();
            gate.wait();
            // 调用者仍拿到自己的结果
            assert_eq!(*builder.join().unwrap(), 1);
        });
        assert!(!cell.is_ready());
        assert!(cell.peek().is_none());

        let builds = AtomicUsize::new(0);
        let v = cell
            .get_or_build(1, || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .unwrap();
        assert_eq!(*v, 2);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_single_build() {
        let cell = GenerationCell::new();
        let builds = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let v = cell
                        .get_or_build(3, || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok(vec![1, 2, 3])
                        })
                        .unwrap();
                    assert_eq!(v.len(), 3);
                });
            }
        });
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
