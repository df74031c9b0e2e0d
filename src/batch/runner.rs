//! # 扫描执行器
//!
//! 在独立的扫描单元（扫描点、k 点、过滤矩阵格点）上并行求值。
//!
//! ## 功能
//! - 基于 rayon 线程池的并行迭代，结果保持输入顺序
//! - 进度条显示
//! - 任一单元失败即中止整个扫描
//!
//! ## 依赖关系
//! - 被 `transport/nanoparticle.rs`、`transport/filtering.rs`、`commands/pipeline.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{Result, TeFilterError};
use crate::utils::progress;

use indicatif::ProgressBar;
use rayon::prelude::*;

/// 有序并行执行器
pub struct SweepRunner {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    show_progress: bool,
    pool: rayon::ThreadPool,
}

impl SweepRunner {
    /// 创建执行器，`jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Result<Self> {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| TeFilterError::Other(format!("Failed to build thread pool: {}", e)))?;
        Ok(Self {
            jobs,
            show_progress: true,
            pool,
        })
    }

    /// 关闭进度条（测试与嵌套扫描中使用）
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    fn progress_bar(&self, len: usize, label: &str) -> ProgressBar {
        if self.show_progress {
            progress::create_progress_bar(len as u64, label)
        } else {
            ProgressBar::hidden()
        }
    }

    /// 并行映射，结果与 `items` 一一对应
    pub fn map<T, R, F>(&self, items: &[T], label: &str, f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let pb = self.progress_bar(items.len(), label);
        let results: Vec<R> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let r = f(item);
                    pb.inc(1);
                    r
                })
                .collect()
        });
        pb.finish_and_clear();
        results
    }

    /// 可失败的并行映射；任一单元出错时返回该错误
    pub fn try_map<T, R, F>(&self, items: &[T], label: &str, f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        let pb = self.progress_bar(items.len(), label);
        let results: Result<Vec<R>> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let r = f(item);
                    pb.inc(1);
                    r
                })
                .collect()
        });
        pb.finish_and_clear();

        if let Err(e) = &results {
            tracing::error!("{} aborted: {}", label, e);
        }
        results
    }
}
