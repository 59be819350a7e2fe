use std::collections::VecDeque;

/// 直近N件だけを保持するFIFO
///
/// 容量を超えてpushすると最古の要素を捨てる。多数決は現在の中身だけで決まる。
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 古い順
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }

    pub fn count_where<F: Fn(&T) -> bool>(&self, pred: F) -> usize {
        self.buf.iter().filter(|v| pred(v)).count()
    }
}

impl<T: Copy + PartialEq> SlidingWindow<T> {
    /// 最頻値とその件数。同数なら古い方に先に現れた値
    pub fn mode(&self) -> Option<(T, usize)> {
        let mut best: Option<(T, usize)> = None;
        for (i, value) in self.buf.iter().enumerate() {
            // 既に数えた値は飛ばす
            if self.buf.iter().take(i).any(|v| v == value) {
                continue;
            }
            let count = self.count_where(|v| v == value);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((*value, count));
            }
        }
        best
    }
}

impl SlidingWindow<bool> {
    pub fn count_true(&self) -> usize {
        self.count_where(|v| *v)
    }

    /// trueが `min_count` 件以上あるか
    pub fn stable_true(&self, min_count: usize) -> bool {
        self.count_true() >= min_count
    }
}

impl SlidingWindow<f32> {
    pub fn mean(&self) -> Option<f32> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.iter().sum::<f32>() / self.buf.len() as f32)
    }
}
