//! 日志管道指标收集模块
//!
//! 将 Dispatcher 的 sink / 队列快照发布到 `metrics` recorder，并在内存中
//! 聚合调用延迟，便于输出摘要。

use std::collections::BTreeMap;

use dispatcher::{MetricsSnapshot, QueueSnapshot};
use metrics::{counter, gauge, histogram};

/// 发布单个 sink 的累计写入 / 失败计数
///
/// 快照是累计值，使用 `absolute` 而不是 `increment`，重复发布不会重复计数。
pub fn record_sink_snapshot(sink: &str, snapshot: &MetricsSnapshot) {
    counter!("logpipe_sink_writes_total", "sink" => sink.to_string())
        .absolute(snapshot.write_count);
    counter!("logpipe_sink_failures_total", "sink" => sink.to_string())
        .absolute(snapshot.failure_count);
}

/// 发布异步队列状态
pub fn record_queue_snapshot(snapshot: &QueueSnapshot) {
    gauge!("logpipe_queue_depth").set(snapshot.queue_len as f64);
    counter!("logpipe_queue_enqueued_total").absolute(snapshot.enqueued_count);
    counter!("logpipe_queue_dropped_after_close_total").absolute(snapshot.dropped_count);
}

/// 记录一次日志调用耗时 (微秒)
pub fn record_call_latency_us(latency_us: f64) {
    histogram!("logpipe_call_latency_us").record(latency_us);
}

/// 调用延迟与 sink 计数聚合器
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 日志调用次数
    pub total_calls: u64,

    /// 调用耗时统计 (微秒)
    pub latency_stats: RunningStats,

    /// 各 sink 最近一次快照
    pub sinks: BTreeMap<String, MetricsSnapshot>,

    /// 最近一次队列快照
    pub queue: QueueSnapshot,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次调用耗时
    pub fn push_latency_us(&mut self, latency_us: f64) {
        self.total_calls += 1;
        self.latency_stats.push(latency_us);
    }

    /// 合并另一个聚合器 (多个生产者各自统计后汇总)
    pub fn merge(&mut self, other: &Self) {
        self.total_calls += other.total_calls;
        self.latency_stats.merge(&other.latency_stats);
    }

    /// 用 Dispatcher 的当前快照更新计数
    pub fn update_snapshots(
        &mut self,
        sinks: impl IntoIterator<Item = (String, MetricsSnapshot)>,
        queue: QueueSnapshot,
    ) {
        self.sinks = sinks.into_iter().collect();
        self.queue = queue;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_calls: self.total_calls,
            call_latency_us: StatsSummary::from(&self.latency_stats),
            sinks: self.sinks.clone(),
            queue: self.queue,
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_calls: u64,
    pub call_latency_us: StatsSummary,
    pub sinks: BTreeMap<String, MetricsSnapshot>,
    pub queue: QueueSnapshot,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Log calls: {}", self.total_calls)?;
        writeln!(f, "Call latency (us): {}", self.call_latency_us)?;
        writeln!(
            f,
            "Queue: enqueued={}, depth={}, dropped after close={}",
            self.queue.enqueued_count, self.queue.queue_len, self.queue.dropped_count
        )?;

        if !self.sinks.is_empty() {
            writeln!(f, "Sinks:")?;
            for (sink, snapshot) in &self.sinks {
                writeln!(
                    f,
                    "  {}: written={}, failed={}",
                    sink, snapshot.write_count, snapshot.failure_count
                )?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 合并两组样本 (Chan et al. 并行公式)
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        self.m2 += other.m2 + delta * delta * (self.count as f64 * other.count as f64) / total as f64;
        self.mean += delta * other.count as f64 / total as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = total;
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
