// crates/erf_foundation/src/weighted.rs

//! 归一化权重列表
//!
//! `WeightedList` 保存一组 (值, 权重) 对，构造时强制权重归一化：
//! 权重和按单精度比较必须等于 1，否则返回 [`EfError::NotNormalized`]。
//! 距离校正集合、破裂面候选集合都使用该类型。
//!
//! # 示例
//!
//! ```
//! use erf_foundation::weighted::WeightedList;
//!
//! let list = WeightedList::new(vec![("a", 0.25), ("b", 0.75)]).unwrap();
//! assert_eq!(list.len(), 2);
//! assert_eq!(*list.sample(0.5), "b");
//!
//! assert!(WeightedList::new(vec![("a", 0.5), ("b", 0.6)]).is_err());
//! ```

use crate::error::{EfError, EfResult};

/// 判断权重和是否为 1（单精度）
#[inline]
pub fn is_normalized_sum(sum: f64) -> bool {
    (sum as f32) == 1.0_f32
}

/// 带权重的值
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedValue<T> {
    /// 值
    pub value: T,
    /// 权重，取值 [0, 1]
    pub weight: f64,
}

/// 归一化权重列表（至少一个元素）
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedList<T> {
    items: Vec<WeightedValue<T>>,
}

impl<T> WeightedList<T> {
    /// 从 (值, 权重) 对创建，要求权重已归一化
    pub fn new(pairs: Vec<(T, f64)>) -> EfResult<Self> {
        if pairs.is_empty() {
            return Err(EfError::invalid_input("权重列表不能为空"));
        }
        for (_, weight) in &pairs {
            EfError::check_range("weight", *weight, 0.0, 1.0)?;
        }
        let sum: f64 = pairs.iter().map(|(_, w)| w).sum();
        if !is_normalized_sum(sum) {
            return Err(EfError::not_normalized("WeightedList", sum));
        }
        Ok(Self {
            items: pairs
                .into_iter()
                .map(|(value, weight)| WeightedValue { value, weight })
                .collect(),
        })
    }

    /// 从任意正权重创建，并按权重和归一化
    pub fn normalized(pairs: Vec<(T, f64)>) -> EfResult<Self> {
        let sum: f64 = pairs.iter().map(|(_, w)| w).sum();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(EfError::invalid_input(format!(
                "无法归一化, 权重和必须为有限正数: {sum}"
            )));
        }
        if pairs.iter().any(|(_, w)| *w < 0.0) {
            return Err(EfError::invalid_input("权重不能为负"));
        }
        Self::new(pairs.into_iter().map(|(v, w)| (v, w / sum)).collect())
    }

    /// 等权重列表
    pub fn evenly_weighted(values: Vec<T>) -> EfResult<Self> {
        if values.is_empty() {
            return Err(EfError::invalid_input("权重列表不能为空"));
        }
        let weight = 1.0 / values.len() as f64;
        Ok(Self {
            items: values
                .into_iter()
                .map(|value| WeightedValue { value, weight })
                .collect(),
        })
    }

    /// 单元素列表（权重 1）
    pub fn single(value: T) -> Self {
        Self {
            items: vec![WeightedValue { value, weight: 1.0 }],
        }
    }

    /// 元素数量
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空（构造保证非空，保留以符合惯例）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 第 i 个值
    #[inline]
    pub fn value(&self, i: usize) -> &T {
        &self.items[i].value
    }

    /// 第 i 个权重
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.items[i].weight
    }

    /// 遍历
    pub fn iter(&self) -> std::slice::Iter<'_, WeightedValue<T>> {
        self.items.iter()
    }

    /// 所有值
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|item| &item.value)
    }

    /// 权重和
    pub fn weight_sum(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }

    /// 权重是否已归一化
    pub fn is_normalized(&self) -> bool {
        is_normalized_sum(self.weight_sum())
    }

    /// 所有权重是否相等
    pub fn are_weights_equal(&self) -> bool {
        let first = self.items[0].weight;
        self.items.iter().all(|item| (item.weight as f32) == (first as f32))
    }

    /// 以本列表权重对给定数值求加权平均
    pub fn weighted_average(&self, values: &[f64]) -> EfResult<f64> {
        EfError::check_size("values", self.len(), values.len())?;
        Ok(self
            .items
            .iter()
            .zip(values)
            .map(|(item, v)| item.weight * v)
            .sum())
    }

    /// 按权重抽样，`rand` 取值 [0, 1)
    pub fn sample(&self, rand: f64) -> &T {
        let mut cumulative = 0.0;
        for item in &self.items {
            cumulative += item.weight;
            if rand < cumulative {
                return &item.value;
            }
        }
        // 浮点累加误差导致未命中时取最后一个
        &self.items[self.items.len() - 1].value
    }

    /// 映射值，保留权重
    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> WeightedList<U> {
        WeightedList {
            items: self
                .items
                .iter()
                .map(|item| WeightedValue {
                    value: f(&item.value),
                    weight: item.weight,
                })
                .collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a WeightedList<T> {
    type Item = &'a WeightedValue<T>;
    type IntoIter = std::slice::Iter<'a, WeightedValue<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
