//! 启动延迟
//!
//! 首次处理推迟到页面空闲时执行；宿主无法提供空闲信号时改用固定延迟。

use std::time::Duration;

use tokio::sync::oneshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupTiming {
    /// 等待空闲信号的上限
    pub idle_timeout: Duration,
    /// 没有空闲信号时的固定延迟
    pub fallback_delay: Duration,
}

impl Default for StartupTiming {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(1500),
            fallback_delay: Duration::from_millis(800),
        }
    }
}

/// 启动被什么触发
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupTrigger {
    Idle,
    IdleTimeout,
    FallbackDelay,
}

/// 等待合适的启动时机
pub async fn defer_startup(
    idle_signal: Option<oneshot::Receiver<()>>,
    timing: StartupTiming,
) -> StartupTrigger {
    let Some(idle_signal) = idle_signal else {
        tokio::time::sleep(timing.fallback_delay).await;
        return StartupTrigger::FallbackDelay;
    };

    tokio::select! {
        signal = idle_signal => match signal {
            Ok(()) => StartupTrigger::Idle,
            // the idle source went away without firing
            Err(_) => {
                tokio::time::sleep(timing.fallback_delay).await;
                StartupTrigger::FallbackDelay
            }
        },
        _ = tokio::time::sleep(timing.idle_timeout) => StartupTrigger::IdleTimeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_fixed_delay_without_idle_signal() {
        let started = tokio::time::Instant::now();
        let trigger = defer_startup(None, StartupTiming::default()).await;
        assert_eq!(trigger, StartupTrigger::FallbackDelay);
        assert!(started.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_signal_wins_before_timeout() {
        let (tx, rx) = oneshot::channel();
        tx.send(()).unwrap();
        let trigger = defer_startup(Some(rx), StartupTiming::default()).await;
        assert_eq!(trigger, StartupTrigger::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_bounds_the_wait() {
        let (_tx, rx) = oneshot::channel::<()>();
        let started = tokio::time::Instant::now();
        let trigger = defer_startup(Some(rx), StartupTiming::default()).await;
        assert_eq!(trigger, StartupTrigger::IdleTimeout);
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
