//! Shared accumulator registers for aggregate operators.
//!
//! Every aggregate reads one or more registers out of an `AggState`. The
//! registers an operator depends on are declared statically, collected into a
//! `Registers` set and instantiated once per cell, so `variance` and `mean`
//! over the same field share a single set of running moments.

use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::HashMap;
use verba_core::{Key, Value};

/// A piece of accumulator state shared between aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    Sum,
    Product,
    Moments,
    CoMoments,
    Min,
    Max,
    List,
    Distinct,
    Any,
}

impl Register {
    #[inline]
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of registers a cell must maintain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers(u16);

impl Registers {
    pub fn empty() -> Self {
        Registers(0)
    }

    pub fn insert(&mut self, reg: Register) {
        self.0 |= reg.bit();
    }

    pub fn extend(&mut self, regs: &[Register]) {
        for r in regs {
            self.insert(*r);
        }
    }

    #[inline]
    pub fn contains(&self, reg: Register) -> bool {
        self.0 & reg.bit() != 0
    }
}

/// Running sum that stays integral until a non-integer value arrives.
#[derive(Clone, Debug, Default)]
pub(crate) struct SumAcc {
    int: i128,
    float: f64,
    non_int: usize,
}

impl SumAcc {
    fn add(&mut self, v: &Value) {
        match v {
            Value::Int64(i) => self.int += *i as i128,
            Value::Boolean(b) => self.int += *b as i128,
            other => {
                self.float += other.as_number();
                self.non_int += 1;
            }
        }
    }

    fn rem(&mut self, v: &Value) {
        match v {
            Value::Int64(i) => self.int -= *i as i128,
            Value::Boolean(b) => self.int -= *b as i128,
            other => {
                self.float -= other.as_number();
                self.non_int -= 1;
            }
        }
    }

    pub(crate) fn value(&self) -> Value {
        if self.non_int == 0 {
            match i64::try_from(self.int) {
                Ok(i) => Value::Int64(i),
                Err(_) => Value::Float64(self.int as f64),
            }
        } else {
            Value::Float64(self.int as f64 + self.float)
        }
    }
}

/// Welford running mean and sum of squared deviations.
#[derive(Clone, Debug, Default)]
pub(crate) struct Moments {
    pub(crate) mean: f64,
    pub(crate) dev: f64,
}

impl Moments {
    /// `n` is the valid count including `v`.
    fn add(&mut self, v: f64, n: usize) {
        let d = v - self.mean;
        self.mean += d / n as f64;
        self.dev += d * (v - self.mean);
    }

    /// `n` is the valid count after removing `v`.
    fn rem(&mut self, v: f64, n: usize) {
        if n == 0 {
            *self = Moments::default();
            return;
        }
        let d = v - self.mean;
        self.mean -= d / n as f64;
        self.dev -= d * (v - self.mean);
    }
}

/// Paired running moments for covariance and correlation.
#[derive(Clone, Debug, Default)]
pub(crate) struct CoMoments {
    pub(crate) mean_x: f64,
    pub(crate) mean_y: f64,
    pub(crate) dev_x: f64,
    pub(crate) dev_y: f64,
    pub(crate) cov: f64,
}

impl CoMoments {
    fn add(&mut self, x: f64, y: f64, n: usize) {
        let n = n as f64;
        let dx = x - self.mean_x;
        let dy = y - self.mean_y;
        self.mean_x += dx / n;
        self.mean_y += dy / n;
        self.cov += dx * (y - self.mean_y);
        self.dev_x += dx * (x - self.mean_x);
        self.dev_y += dy * (y - self.mean_y);
    }

    fn rem(&mut self, x: f64, y: f64, n: usize) {
        if n == 0 {
            *self = CoMoments::default();
            return;
        }
        let n = n as f64;
        let dx = x - self.mean_x;
        let dy = y - self.mean_y;
        self.mean_x -= dx / n;
        self.mean_y -= dy / n;
        self.cov -= (x - self.mean_x) * dy;
        self.dev_x -= (x - self.mean_x) * dx;
        self.dev_y -= (y - self.mean_y) * dy;
    }
}

/// Running minimum or maximum.
///
/// Removing the current extreme marks it stale; it is then recomputed from
/// the retained value list on the next read.
#[derive(Clone, Debug)]
pub(crate) struct Extreme {
    value: Option<Value>,
    stale: bool,
    keep: Ordering,
}

impl Extreme {
    fn new(keep: Ordering) -> Self {
        Self {
            value: None,
            stale: false,
            keep,
        }
    }

    fn add(&mut self, v: &Value) {
        if self.stale {
            return;
        }
        match &self.value {
            Some(cur) if v.cmp(cur) != self.keep => {}
            _ => self.value = Some(v.clone()),
        }
    }

    fn rem(&mut self, v: &Value) {
        if let Some(cur) = &self.value {
            if v.cmp(cur) != self.keep.reverse() {
                self.stale = true;
            }
        }
    }

    fn refresh(&mut self, list: Option<&ValueList>) {
        if !self.stale {
            return;
        }
        if let Some(list) = list {
            let keep = self.keep;
            self.value = list
                .values()
                .iter()
                .fold(None, |acc: Option<&Value>, v| match acc {
                    Some(cur) if v.cmp(cur) != keep => Some(cur),
                    _ => Some(v),
                })
                .cloned();
            self.stale = false;
        }
    }

    pub(crate) fn value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
}

/// FIFO list of retained values.
///
/// Window frames only ever drop their oldest rows, so removal pops from the
/// front.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    values: Vec<Value>,
    start: usize,
    sorted: Option<Vec<f64>>,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, v: Value) {
        self.values.push(v);
        self.sorted = None;
    }

    pub fn rem(&mut self) {
        self.start += 1;
        self.sorted = None;
        if self.start * 2 > self.values.len() {
            self.values.drain(..self.start);
            self.start = 0;
        }
    }

    /// Retained values, oldest first.
    pub fn values(&self) -> &[Value] {
        &self.values[self.start..]
    }

    pub fn len(&self) -> usize {
        self.values.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpolated quantile over the numeric values; Null when empty.
    pub fn quantile(&mut self, p: f64) -> Value {
        if self.sorted.is_none() {
            let mut nums: Vec<f64> = self
                .values()
                .iter()
                .map(Value::as_number)
                .filter(|v| !v.is_nan())
                .collect();
            nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            self.sorted = Some(nums);
        }
        let sorted = match &self.sorted {
            Some(s) => s,
            None => return Value::Null,
        };
        let n = sorted.len();
        if n == 0 {
            return Value::Null;
        }
        if p <= 0.0 || n < 2 {
            return Value::Float64(sorted[0]);
        }
        if p >= 1.0 {
            return Value::Float64(sorted[n - 1]);
        }
        let i = (n - 1) as f64 * p;
        let i0 = libm::floor(i) as usize;
        let v0 = sorted[i0];
        let v1 = sorted[i0 + 1];
        Value::Float64(v0 + (v1 - v0) * (i - i0 as f64))
    }
}

/// Reference-counted map of distinct values in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct DistinctMap {
    entries: Vec<(Value, usize)>,
    index: HashMap<Key, usize>,
    live: usize,
}

impl DistinctMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, v: &Value) {
        let key = Key::from(v);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.entries.push((v.clone(), 0));
                self.index.insert(key, slot);
                slot
            }
        };
        if self.entries[slot].1 == 0 {
            self.live += 1;
        }
        self.entries[slot].1 += 1;
    }

    pub fn decrement(&mut self, v: &Value) {
        if let Some(&slot) = self.index.get(&Key::from(v)) {
            let entry = &mut self.entries[slot];
            if entry.1 > 0 {
                entry.1 -= 1;
                if entry.1 == 0 {
                    self.live -= 1;
                }
            }
        }
    }

    /// Number of distinct values currently present.
    pub fn count(&self) -> usize {
        self.live
    }

    /// Present values in first-seen order.
    pub fn values(&self) -> Vec<Value> {
        self.entries
            .iter()
            .filter(|(_, c)| *c > 0)
            .map(|(v, _)| v.clone())
            .collect()
    }

    /// Most frequent value; the first seen wins ties.
    pub fn mode(&self) -> Value {
        let mut best: Option<&(Value, usize)> = None;
        for entry in &self.entries {
            if entry.1 > best.map_or(0, |b| b.1) {
                best = Some(entry);
            }
        }
        best.map(|(v, _)| v.clone()).unwrap_or(Value::Null)
    }
}

/// Accumulation cell for one group of fused aggregates.
#[derive(Clone, Debug, Default)]
pub struct AggState {
    /// Rows seen.
    pub count: usize,
    /// Rows whose every field value was valid.
    pub valid: usize,
    pub(crate) sum: Option<SumAcc>,
    pub(crate) product: Option<f64>,
    pub(crate) moments: Option<Moments>,
    pub(crate) comoments: Option<CoMoments>,
    pub(crate) min: Option<Extreme>,
    pub(crate) max: Option<Extreme>,
    pub(crate) list: Option<ValueList>,
    pub(crate) distinct: Option<DistinctMap>,
    pub(crate) any: Option<Value>,
    track_any: bool,
}

impl AggState {
    /// Creates a cell maintaining the given registers.
    pub fn new(regs: Registers) -> Self {
        Self {
            count: 0,
            valid: 0,
            sum: regs.contains(Register::Sum).then(SumAcc::default),
            product: regs.contains(Register::Product).then_some(1.0),
            moments: regs.contains(Register::Moments).then(Moments::default),
            comoments: regs.contains(Register::CoMoments).then(CoMoments::default),
            min: regs
                .contains(Register::Min)
                .then(|| Extreme::new(Ordering::Less)),
            max: regs
                .contains(Register::Max)
                .then(|| Extreme::new(Ordering::Greater)),
            list: regs.contains(Register::List).then(ValueList::new),
            distinct: regs.contains(Register::Distinct).then(DistinctMap::new),
            any: None,
            track_any: regs.contains(Register::Any),
        }
    }

    /// Adds one row given its field values.
    ///
    /// Registers only see rows whose field values are all valid; with no
    /// fields only the row count moves.
    pub fn add(&mut self, values: &[Value]) {
        self.count += 1;
        if values.is_empty() || !values.iter().all(Value::is_valid) {
            return;
        }
        self.valid += 1;
        let v = &values[0];
        if let Some(list) = &mut self.list {
            list.add(pack(values));
        }
        if let Some(sum) = &mut self.sum {
            sum.add(v);
        }
        if let Some(p) = &mut self.product {
            *p *= v.as_number();
        }
        if let Some(m) = &mut self.moments {
            m.add(v.as_number(), self.valid);
        }
        if let (Some(c), Some(y)) = (&mut self.comoments, values.get(1)) {
            c.add(v.as_number(), y.as_number(), self.valid);
        }
        if let Some(e) = &mut self.min {
            e.add(v);
        }
        if let Some(e) = &mut self.max {
            e.add(v);
        }
        if let Some(d) = &mut self.distinct {
            d.increment(v);
        }
        if self.track_any && self.any.is_none() {
            self.any = Some(v.clone());
        }
    }

    /// Removes one row previously passed to `add`.
    pub fn rem(&mut self, values: &[Value]) {
        self.count -= 1;
        if values.is_empty() || !values.iter().all(Value::is_valid) {
            return;
        }
        self.valid -= 1;
        let v = &values[0];
        if let Some(list) = &mut self.list {
            list.rem();
        }
        if let Some(sum) = &mut self.sum {
            sum.rem(v);
        }
        if let Some(p) = &mut self.product {
            *p /= v.as_number();
        }
        if let Some(m) = &mut self.moments {
            m.rem(v.as_number(), self.valid);
        }
        if let (Some(c), Some(y)) = (&mut self.comoments, values.get(1)) {
            c.rem(v.as_number(), y.as_number(), self.valid);
        }
        if let Some(e) = &mut self.min {
            e.rem(v);
        }
        if let Some(e) = &mut self.max {
            e.rem(v);
        }
        if let Some(d) = &mut self.distinct {
            d.decrement(v);
        }
    }

    /// Recomputes stale extremes from the retained list.
    pub(crate) fn refresh(&mut self) {
        let list = self.list.as_ref();
        if let Some(e) = &mut self.min {
            e.refresh(list);
        }
        if let Some(e) = &mut self.max {
            e.refresh(list);
        }
    }

    pub fn list(&self) -> Option<&ValueList> {
        self.list.as_ref()
    }

    pub fn distinct(&self) -> Option<&DistinctMap> {
        self.distinct.as_ref()
    }
}

fn pack(values: &[Value]) -> Value {
    if values.len() == 1 {
        values[0].clone()
    } else {
        Value::Array(values.to_vec())
    }
}

/// Builds an object from retained `[key, value]` pairs; later keys win.
pub(crate) fn object_from_pairs(list: &ValueList) -> Value {
    let mut map = BTreeMap::new();
    for pair in list.values() {
        if let Value::Array(kv) = pair {
            if let (Some(k), Some(v)) = (kv.first(), kv.get(1)) {
                map.insert(k.to_string(), v.clone());
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn regs(list: &[Register]) -> Registers {
        let mut r = Registers::empty();
        r.extend(list);
        r
    }

    #[test]
    fn test_count_and_valid() {
        let mut s = AggState::new(Registers::empty());
        s.add(&[Value::Int64(1)]);
        s.add(&[Value::Null]);
        s.add(&[Value::nan()]);
        assert_eq!(s.count, 3);
        assert_eq!(s.valid, 1);
        s.rem(&[Value::Null]);
        assert_eq!(s.count, 2);
        assert_eq!(s.valid, 1);
    }

    #[test]
    fn test_sum_integer_preserving() {
        let mut s = AggState::new(regs(&[Register::Sum]));
        s.add(&[Value::Int64(2)]);
        s.add(&[Value::Int64(3)]);
        assert_eq!(s.sum.as_ref().unwrap().value(), Value::Int64(5));
        s.add(&[Value::Float64(0.5)]);
        assert_eq!(s.sum.as_ref().unwrap().value(), Value::Float64(5.5));
        s.rem(&[Value::Float64(0.5)]);
        assert_eq!(s.sum.as_ref().unwrap().value(), Value::Int64(5));
    }

    #[test]
    fn test_moments_add_rem() {
        let mut s = AggState::new(regs(&[Register::Moments]));
        for v in [1.0, 2.0, 3.0, 4.0] {
            s.add(&[Value::Float64(v)]);
        }
        let m = s.moments.as_ref().unwrap();
        assert!((m.mean - 2.5).abs() < 1e-12);
        assert!((m.dev - 5.0).abs() < 1e-12);

        s.rem(&[Value::Float64(1.0)]);
        let m = s.moments.as_ref().unwrap();
        assert!((m.mean - 3.0).abs() < 1e-12);
        assert!((m.dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_comoments_add_rem() {
        let mut s = AggState::new(regs(&[Register::CoMoments]));
        let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 7.0)];
        for (x, y) in pairs {
            s.add(&[Value::Float64(x), Value::Float64(y)]);
        }
        s.rem(&[Value::Float64(1.0), Value::Float64(2.0)]);
        let c = s.comoments.as_ref().unwrap();
        // remaining pairs (2,4), (3,7)
        assert!((c.mean_x - 2.5).abs() < 1e-12);
        assert!((c.mean_y - 5.5).abs() < 1e-12);
        assert!((c.cov - 1.5).abs() < 1e-12);
        assert!((c.dev_x - 0.5).abs() < 1e-12);
        assert!((c.dev_y - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_min_recomputes_after_removal() {
        let mut s = AggState::new(regs(&[Register::Min, Register::List]));
        for v in [3i64, 1, 2] {
            s.add(&[Value::Int64(v)]);
        }
        assert_eq!(s.min.as_ref().unwrap().value(), Value::Int64(1));
        s.rem(&[Value::Int64(3)]);
        s.rem(&[Value::Int64(1)]);
        s.refresh();
        assert_eq!(s.min.as_ref().unwrap().value(), Value::Int64(2));
    }

    #[test]
    fn test_value_list_fifo_and_quantile() {
        let mut list = ValueList::new();
        for v in [5i64, 1, 3, 2] {
            list.add(Value::Int64(v));
        }
        assert_eq!(list.quantile(0.5), Value::Float64(2.5));
        list.rem();
        assert_eq!(list.values(), &[Value::Int64(1), Value::Int64(3), Value::Int64(2)]);
        assert_eq!(list.quantile(0.5), Value::Float64(2.0));
        assert_eq!(list.quantile(1.0), Value::Float64(3.0));
    }

    #[test]
    fn test_distinct_map() {
        let mut d = DistinctMap::new();
        d.increment(&Value::from("b"));
        d.increment(&Value::from("a"));
        d.increment(&Value::from("a"));
        assert_eq!(d.count(), 2);
        assert_eq!(d.mode(), Value::from("a"));
        d.decrement(&Value::from("b"));
        assert_eq!(d.values(), vec![Value::from("a")]);
        assert_eq!(d.count(), 1);
    }

    #[test]
    fn test_object_from_pairs() {
        let mut list = ValueList::new();
        list.add(Value::Array(vec![Value::from("x"), Value::Int64(1)]));
        list.add(Value::Array(vec![Value::from("y"), Value::Int64(2)]));
        match object_from_pairs(&list) {
            Value::Object(map) => {
                assert_eq!(map.get("x"), Some(&Value::Int64(1)));
                assert_eq!(map.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
