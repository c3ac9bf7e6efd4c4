// crates/erf_core/src/nth.rs

//! 全局破裂编号
//!
//! 把预测中所有震源的破裂按顺序拼接为 `0..total` 的扁平编号。
//! 偏移表记录每个震源首个破裂的扁平编号，空震源的偏移与其后
//! 第一个非空震源相同（重复偏移），反查时二分后向前推进到最后一个重复项。
//!
//! ```text
//! 破裂数   [0, 2, 1]
//! 偏移表   [0, 0, 2]   total = 3
//! 扁平 0 → 震源 1,  扁平 2 → 震源 2
//! ```
//!
//! 偏移表按预测代际懒构建并缓存于 [`GenerationCell`]，表与总数作为
//! 一个整体存放与作废。

use crate::forecast::Forecast;
use crate::rupture::Rupture;
use erf_foundation::{EfError, EfResult, GenerationCell};
use std::ops::Range;
use std::sync::Arc;

/// 每个震源的起始扁平编号及破裂总数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: Vec<usize>,
    total: usize,
}

impl OffsetTable {
    /// 由逐震源破裂数构建
    pub fn build(counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut running = 0usize;
        for &count in counts {
            offsets.push(running);
            running += count;
        }
        Self {
            offsets,
            total: running,
        }
    }

    /// 由现成偏移创建，偏移必须非递减且不超过总数
    pub fn from_offsets(offsets: Vec<usize>, total: usize) -> EfResult<Self> {
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(EfError::invalid_input("偏移表必须非递减"));
        }
        if offsets.last().is_some_and(|&last| last > total) {
            return Err(EfError::invalid_input(format!(
                "偏移 {:?} 超过破裂总数 {total}",
                offsets.last()
            )));
        }
        Ok(Self { offsets, total })
    }

    /// 起始偏移
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// 破裂总数
    pub fn total(&self) -> usize {
        self.total
    }

    /// 震源数
    pub fn num_sources(&self) -> usize {
        self.offsets.len()
    }

    /// 扁平编号所属震源
    pub fn source_index_for_nth(&self, nth: usize) -> EfResult<usize> {
        if nth >= self.total {
            return Err(EfError::index_out_of_bounds("nth rupture", nth, self.total));
        }
        match self.offsets.binary_search(&nth) {
            Ok(mut pos) => {
                // 跳过起点相同的空震源
                while pos + 1 < self.offsets.len() && self.offsets[pos + 1] == nth {
                    pos += 1;
                }
                Ok(pos)
            }
            Err(0) => Err(EfError::internal(format!(
                "偏移表首项 {:?} 非零, 无法定位扁平编号 {nth}",
                self.offsets.first()
            ))),
            Err(insertion) => Ok(insertion - 1),
        }
    }

    /// 震源拥有的扁平编号区间
    pub fn rupture_indices_for_source(&self, source: usize) -> EfResult<Range<usize>> {
        EfError::check_index("source", source, self.offsets.len())?;
        let start = self.offsets[source];
        let end = match self.offsets.get(source + 1) {
            Some(&next) => next,
            None => self.total,
        };
        Ok(start..end)
    }

    /// 扁平编号在所属震源内的破裂编号
    pub fn rupture_index_in_source_for_nth(&self, nth: usize) -> EfResult<usize> {
        let source = self.source_index_for_nth(nth)?;
        Ok(nth - self.offsets[source])
    }
}

/// 按预测代际缓存的全局破裂编号
#[derive(Debug, Default)]
pub struct NthRuptureIndex {
    cell: GenerationCell<OffsetTable>,
}

impl NthRuptureIndex {
    /// 创建空索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 取当前代际的偏移表，必要时构建
    pub fn table<F: Forecast + ?Sized>(&self, forecast: &F) -> EfResult<Arc<OffsetTable>> {
        let generation = forecast.generation();
        self.cell.get_or_build(generation, || {
            let counts = (0..forecast.num_sources())
                .map(|s| forecast.num_ruptures(s))
                .collect::<EfResult<Vec<_>>>()?;
            let table = OffsetTable::build(&counts);
            log::debug!(
                "重建 '{}' 的全局破裂编号: 代际 {}, {} 个震源, 共 {} 个破裂",
                forecast.name(),
                generation,
                table.num_sources(),
                table.total()
            );
            Ok(table)
        })
    }

    /// 作废偏移表
    pub fn invalidate(&self) {
        self.cell.invalidate();
    }

    /// 破裂总数
    pub fn total_num_ruptures<F: Forecast + ?Sized>(&self, forecast: &F) -> EfResult<usize> {
        Ok(self.table(forecast)?.total())
    }

    /// 震源拥有的扁平编号区间
    pub fn nth_rup_indices_for_source<F: Forecast + ?Sized>(
        &self,
        forecast: &F,
        source: usize,
    ) -> EfResult<Range<usize>> {
        self.table(forecast)?.rupture_indices_for_source(source)
    }

    /// 扁平编号所属震源
    pub fn src_index_for_nth_rup<F: Forecast + ?Sized>(
        &self,
        forecast: &F,
        nth: usize,
    ) -> EfResult<usize> {
        self.table(forecast)?.source_index_for_nth(nth)
    }

    /// 扁平编号在所属震源内的破裂编号
    pub fn rup_index_in_source_for_nth_rup<F: Forecast + ?Sized>(
        &self,
        forecast: &F,
        nth: usize,
    ) -> EfResult<usize> {
        self.table(forecast)?.rupture_index_in_source_for_nth(nth)
    }

    /// 第 n 个破裂
    pub fn nth_rupture<F: Forecast + ?Sized>(&self, forecast: &F, nth: usize) -> EfResult<Rupture> {
        let table = self.table(forecast)?;
        let source = table.source_index_for_nth(nth)?;
        let index = nth - table.offsets()[source];
        forecast.rupture(source, index)
    }
}

/// 提供全局破裂编号的预测
pub trait NthRuptureForecast: Forecast {
    /// 本预测持有的编号索引
    fn nth_index(&self) -> &NthRuptureIndex;

    /// 破裂总数
    fn total_num_ruptures(&self) -> EfResult<usize> {
        self.nth_index().total_num_ruptures(self)
    }

    /// 震源拥有的扁平编号区间
    fn nth_rup_indices_for_source(&self, source: usize) -> EfResult<Range<usize>> {
        self.nth_index().nth_rup_indices_for_source(self, source)
    }

    /// 扁平编号所属震源
    fn src_index_for_nth_rup(&self, nth: usize) -> EfResult<usize> {
        self.nth_index().src_index_for_nth_rup(self, nth)
    }

    /// 扁平编号在所属震源内的破裂编号
    fn rup_index_in_source_for_nth_rup(&self, nth: usize) -> EfResult<usize> {
        self.nth_index().rup_index_in_source_for_nth_rup(self, nth)
    }

    /// 第 n 个破裂
    fn nth_rupture(&self, nth: usize) -> EfResult<Rupture> {
        self.nth_index().nth_rupture(self, nth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erf_foundation::ErrorKind;

    #[test]
    fn test_empty_first_source() {
        let table = OffsetTable::build(&[0, 2, 1]);
        assert_eq!(table.offsets(), &[0, 0, 2]);
        assert_eq!(table.total(), 3);
        assert_eq!(table.source_index_for_nth(0).unwrap(), 1);
        assert_eq!(table.source_index_for_nth(1).unwrap(), 1);
        assert_eq!(table.source_index_for_nth(2).unwrap(), 2);
        assert_eq!(table.rupture_index_in_source_for_nth(1).unwrap(), 1);
        assert_eq!(table.rupture_indices_for_source(0).unwrap(), 0..0);
        assert_eq!(table.rupture_indices_for_source(2).unwrap(), 2..3);
    }

    #[test]
    fn test_runs_of_empty_sources() {
        let table = OffsetTable::build(&[3, 0, 0, 0, 2, 0]);
        assert_eq!(table.offsets(), &[0, 3, 3, 3, 3, 5]);
        assert_eq!(table.source_index_for_nth(2).unwrap(), 0);
        assert_eq!(table.source_index_for_nth(3).unwrap(), 4);
        assert_eq!(table.source_index_for_nth(4).unwrap(), 4);
        assert_eq!(table.rupture_indices_for_source(5).unwrap(), 5..5);
    }

    #[test]
    fn test_out_of_range() {
        let table = OffsetTable::build(&[1, 1]);
        let err = table.source_index_for_nth(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().contains('2'));
        assert!(table.rupture_indices_for_source(2).is_err());

        let empty = OffsetTable::build(&[]);
        assert!(empty.source_index_for_nth(0).is_err());
    }

    #[test]
    fn test_malformed_first_offset_is_internal() {
        let table = OffsetTable::from_offsets(vec![2, 4], 6).unwrap();
        let err = table.source_index_for_nth(1).unwrap_err();
        assert!(err.is_internal());
        assert!(OffsetTable::from_offsets(vec![3, 1], 6).is_err());
    }
}
